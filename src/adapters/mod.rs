//! 外部动作适配器：容器控制、n8n 工作流 API、归档管理、主机状态
//!
//! 适配器只做委托，失败统一转为 BotError 返回，不向上抛出。

pub mod archive;
pub mod container;
pub mod host;
pub mod workflows;

pub use archive::{ArchiveManager, ArchivePaths, RestoreReport};
pub use container::{ContainerControl, ContainerStatus, DockerCli};
pub use host::{HostProbe, HostSnapshot, SysinfoProbe};
pub use workflows::{N8nClient, Workflow, WorkflowRegistry};
