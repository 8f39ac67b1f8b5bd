//! 文本命令解析：`/name[@bot] args...` → Verb

use crate::dispatch::Verb;

/// `/n8n_logs <n>` 允许的最大行数
pub const MAX_LOG_TAIL_LINES: usize = 2000;

pub const HELP_TEXT: &str = "Commands:\n\
/start - Show main menu\n\
/help - Show this help\n\
/status - Show server + n8n status\n\
/n8n_start - Start n8n container\n\
/n8n_stop - Stop n8n container\n\
/n8n_restart - Restart n8n container\n\
/n8n_logs [lines] - Tail n8n logs\n\
/backup - Create backup and send file\n\
/restore - Reply with a backup file to restore\n\
/list_workflows - List workflows (with buttons)\n\
Use inline buttons for quick actions.";

/// 拆分命令文本；非 `/` 开头返回 None。命令名去掉 `@botname` 后缀并转小写
pub fn split_command(text: &str) -> Option<(String, Vec<String>)> {
    let rest = text.trim().strip_prefix('/')?;
    let mut words = rest.split_whitespace();
    let head = words.next()?;
    let name = head.split('@').next().unwrap_or(head).to_lowercase();
    if name.is_empty() {
        return None;
    }
    Some((name, words.map(str::to_string).collect()))
}

/// 命令名 + 参数 → Verb；未知命令返回 None。
/// 目前只有 `/n8n_logs` 读取参数（行数，非法值忽略，超过上限截断）
pub fn verb_for_command(name: &str, args: &[String]) -> Option<Verb> {
    let verb = match name {
        "start" | "menu" => Verb::Menu,
        "help" => Verb::Help,
        "status" => Verb::Status,
        "n8n_start" => Verb::ContainerStart,
        "n8n_stop" => Verb::ContainerStop,
        "n8n_restart" => Verb::ContainerRestart,
        "n8n_logs" => Verb::LogsTail {
            lines: args
                .first()
                .and_then(|a| a.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .map(|n| n.min(MAX_LOG_TAIL_LINES)),
        },
        "backup" => Verb::BackupCreate,
        "restore" => Verb::RestorePrompt,
        "list_workflows" => Verb::WorkflowsList,
        _ => return None,
    };
    Some(verb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_command() {
        assert_eq!(split_command("/start"), Some(("start".into(), vec![])));
        assert_eq!(
            split_command("  /N8N_Logs@n8n_bee_bot  50 "),
            Some(("n8n_logs".into(), vec!["50".into()]))
        );
        assert_eq!(split_command("hello"), None);
        assert_eq!(split_command("/"), None);
        assert_eq!(split_command("/@bot"), None);
    }

    #[test]
    fn test_every_help_command_is_routable() {
        for line in HELP_TEXT.lines().filter(|l| l.starts_with('/')) {
            let (name, _) = split_command(line.split(' ').next().unwrap()).unwrap();
            assert!(verb_for_command(&name, &[]).is_some(), "/{name} has no verb");
        }
        assert_eq!(verb_for_command("n8n_restart", &[]), Some(Verb::ContainerRestart));
        assert_eq!(verb_for_command("reboot", &[]), None);
    }

    #[test]
    fn test_logs_line_argument() {
        let logs = |args: &[&str]| {
            let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
            verb_for_command("n8n_logs", &args)
        };
        assert_eq!(logs(&[]), Some(Verb::LogsTail { lines: None }));
        assert_eq!(logs(&["20"]), Some(Verb::LogsTail { lines: Some(20) }));
        assert_eq!(logs(&["0"]), Some(Verb::LogsTail { lines: None }));
        assert_eq!(logs(&["lots"]), Some(Verb::LogsTail { lines: None }));
        assert_eq!(
            logs(&["999999"]),
            Some(Verb::LogsTail { lines: Some(MAX_LOG_TAIL_LINES) })
        );
    }
}
