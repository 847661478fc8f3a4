use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Datasets,
    Open {
        dataset: String,
    },
    Show,
    Columns,
    Preview,
    Set {
        field: String,
        value: String,
    },
    Column {
        name: String,
        attr: String,
        value: String,
    },
    Validate,
    Save,
    Discard,
    Explore {
        field: String,
    },
    Help,
    Quit,
    Unknown(String),
}

pub const HELP_LINES: &[&str] = &[
    "datasets                          列出 datasets/ 下的数据集",
    "open <dataset>                    打开数据集开始编辑",
    "show                              显示当前记录",
    "columns                           显示可选列",
    "preview                           显示采样的前几行",
    "set <field> <value>               修改字段（列表用逗号分隔）",
    "column <name> <label|type|description> <value>",
    "validate                          校验当前记录",
    "save                              校验并保存",
    "discard                           放弃当前会话",
    "explore <key>                      查看所有元数据中的某个 key",
    "help | quit",
];

/// 跳过前 `n` 个空白分隔的词，返回剩余部分（保留内部空白）
fn rest_after(s: &str, n: usize) -> &str {
    let mut rest = s.trim_start();
    for _ in 0..n {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        rest = rest[end..].trim_start();
    }
    rest.trim_end()
}

impl FromStr for AppCommand {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        if parts.is_empty() {
            return Ok(AppCommand::Unknown("".to_string()));
        }

        match parts[0] {
            "datasets" | "ls" => Ok(AppCommand::Datasets),
            "open" => {
                if let Some(ds) = parts.get(1) {
                    Ok(AppCommand::Open {
                        dataset: ds.to_string(),
                    })
                } else {
                    Ok(AppCommand::Unknown("用法: open <dataset>".to_string()))
                }
            }
            "show" => Ok(AppCommand::Show),
            "columns" | "cols" => Ok(AppCommand::Columns),
            "preview" => Ok(AppCommand::Preview),
            "set" => match parts.get(1) {
                Some(field) => Ok(AppCommand::Set {
                    field: field.to_string(),
                    value: rest_after(s, 2).to_string(),
                }),
                None => Ok(AppCommand::Unknown("用法: set <field> <value>".to_string())),
            },
            "column" | "col" => match (parts.get(1), parts.get(2)) {
                (Some(name), Some(attr)) => Ok(AppCommand::Column {
                    name: name.to_string(),
                    attr: attr.to_string(),
                    value: rest_after(s, 3).to_string(),
                }),
                _ => Ok(AppCommand::Unknown(
                    "用法: column <name> <label|type|description> <value>".to_string(),
                )),
            },
            "validate" | "check" => Ok(AppCommand::Validate),
            "save" => Ok(AppCommand::Save),
            "discard" => Ok(AppCommand::Discard),
            "explore" => match parts.get(1) {
                Some(field) => Ok(AppCommand::Explore {
                    field: field.to_string(),
                }),
                None => Ok(AppCommand::Unknown("用法: explore <key>".to_string())),
            },
            "help" | "h" => Ok(AppCommand::Help),
            "quit" | "q" | "exit" => Ok(AppCommand::Quit),
            _ => Ok(AppCommand::Unknown(format!("未知命令: {}", parts[0]))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> AppCommand {
        s.parse().unwrap()
    }

    #[test]
    fn simple_commands() {
        assert_eq!(parse("datasets"), AppCommand::Datasets);
        assert_eq!(parse("  q "), AppCommand::Quit);
        assert_eq!(
            parse("open county_pop"),
            AppCommand::Open {
                dataset: "county_pop".into()
            }
        );
        assert!(matches!(parse("open"), AppCommand::Unknown(_)));
        assert!(matches!(parse("frobnicate"), AppCommand::Unknown(_)));
    }

    #[test]
    fn set_keeps_inner_whitespace() {
        assert_eq!(
            parse("set description  Residue  from crops "),
            AppCommand::Set {
                field: "description".into(),
                value: "Residue  from crops".into(),
            }
        );
        assert_eq!(
            parse("set source"),
            AppCommand::Set {
                field: "source".into(),
                value: "".into(),
            }
        );
        assert_eq!(
            parse(r#"set visualization {"type": "fill"}"#),
            AppCommand::Set {
                field: "visualization".into(),
                value: r#"{"type": "fill"}"#.into(),
            }
        );
    }

    #[test]
    fn column_command() {
        assert_eq!(
            parse("column pop label Total population"),
            AppCommand::Column {
                name: "pop".into(),
                attr: "label".into(),
                value: "Total population".into(),
            }
        );
        assert!(matches!(parse("column pop"), AppCommand::Unknown(_)));
    }

    #[test]
    fn explore_accepts_any_key() {
        assert_eq!(
            parse("explore source"),
            AppCommand::Explore {
                field: "source".into()
            }
        );
        assert_eq!(
            parse("explore details_modals"),
            AppCommand::Explore {
                field: "details_modals".into()
            }
        );
        assert!(matches!(parse("explore"), AppCommand::Unknown(_)));
    }
}
