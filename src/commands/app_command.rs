use std::str::FromStr;

pub const HELP_TEXT: &str = "可用命令:
  sync     立即执行一次净值同步
  metrics  把指标重算任务加入队列
  status   查看同步状态和数据规模
  help     显示本帮助
  quit     退出";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    Sync,
    Metrics,
    Status,
    Help,
    Quit,
    Unknown(String),
}

impl FromStr for AppCommand {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        if parts.is_empty() {
            return Ok(AppCommand::Unknown("".to_string()));
        }

        match parts[0].to_ascii_lowercase().as_str() {
            "sync" | "s" => Ok(AppCommand::Sync),
            "metrics" | "m" => Ok(AppCommand::Metrics),
            "status" | "st" => Ok(AppCommand::Status),
            "help" | "h" => Ok(AppCommand::Help),
            "quit" | "q" | "exit" => Ok(AppCommand::Quit),
            _ => Ok(AppCommand::Unknown(format!("未知命令: {}", s.trim()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_commands() {
        assert_eq!("sync".parse::<AppCommand>(), Ok(AppCommand::Sync));
        assert_eq!("  METRICS ".parse::<AppCommand>(), Ok(AppCommand::Metrics));
        assert_eq!("status".parse::<AppCommand>(), Ok(AppCommand::Status));
        assert_eq!("q".parse::<AppCommand>(), Ok(AppCommand::Quit));
        assert_eq!("exit".parse::<AppCommand>(), Ok(AppCommand::Quit));
    }

    #[test]
    fn unknown_input_is_kept() {
        assert_eq!(
            "backfill now".parse::<AppCommand>(),
            Ok(AppCommand::Unknown("未知命令: backfill now".to_string()))
        );
        assert_eq!("".parse::<AppCommand>(), Ok(AppCommand::Unknown("".to_string())));
    }
}
