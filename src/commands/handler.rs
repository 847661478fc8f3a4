use crate::app_state::App;
use crate::commands::app_command::{AppCommand, HELP_LINES};
use crate::metadata::{CurationError, FieldEdit};
use crate::metadata::working::{parse_access_level, parse_visualization};
use crate::session::ExploreValue;
use log::{error, info};

/// 执行一条命令，结果通过 AppEvent 发出。返回 false 表示退出。
pub async fn handle(app: &mut App, cmd: AppCommand) -> bool {
    match cmd {
        AppCommand::Datasets => match app.service.list_datasets().await {
            Ok(keys) if keys.is_empty() => app.message("datasets/ 下没有数据集".to_string()),
            Ok(keys) => app.lines(keys),
            Err(e) => app.error(format!("✗ 列出数据集失败: {}", e)),
        },
        AppCommand::Open { dataset } => open(app, &dataset).await,
        AppCommand::Show => show(app),
        AppCommand::Columns => {
            if let Some(session) = app.require_session() {
                if session.available.is_empty() {
                    app.warning("当前数据集没有可选列".to_string());
                } else {
                    app.lines(session.available.names().to_vec());
                }
            }
        }
        AppCommand::Preview => {
            if app.require_session().is_some() {
                if app.preview.is_empty() {
                    app.message("没有可预览的行".to_string());
                } else {
                    let rows = app
                        .preview
                        .iter()
                        .map(|row| serde_json::to_string(row).unwrap_or_default())
                        .collect();
                    app.lines(rows);
                }
            }
        }
        AppCommand::Set { field, value } => match FieldEdit::parse(&field, &value) {
            Ok(edit) => apply(app, edit, &field),
            Err(e) => app.error(format!("✗ {}", e)),
        },
        AppCommand::Column { name, attr, value } => {
            match FieldEdit::parse_column(&name, &attr, &value) {
                Ok(edit) => apply(app, edit, &format!("{}.{}", name, attr)),
                Err(e) => app.error(format!("✗ {}", e)),
            }
        }
        AppCommand::Validate => {
            if let Some(session) = app.require_session() {
                let issues = app.service.validate(session);
                for w in session.advisories() {
                    app.warning(format!("⚠ {}", w));
                }
                if issues.is_empty() {
                    app.message("✓ 校验通过".to_string());
                } else {
                    app.error(format!("✗ {} 个问题", issues.len()));
                    app.lines(issues.iter().map(|i| format!("  - {}", i)).collect());
                }
            }
        }
        AppCommand::Save => save(app).await,
        AppCommand::Discard => {
            if let Some(session) = app.session.take() {
                app.preview.clear();
                app.message(format!("已放弃 {} 的修改", session.dataset_id));
            } else {
                app.message("没有打开的数据集".to_string());
            }
        }
        AppCommand::Explore { field } => match app.service.explore_field(&field).await {
            Ok(rows) if rows.is_empty() => app.message("metadata/ 下没有元数据".to_string()),
            Ok(rows) => {
                let lines = rows
                    .into_iter()
                    .map(|row| match row.value {
                        ExploreValue::Present(v) => format!("{}: {}", row.key, v),
                        ExploreValue::Missing => format!("{}: (缺失)", row.key),
                        ExploreValue::Unreadable(reason) => {
                            format!("{}: (无法读取: {})", row.key, reason)
                        }
                    })
                    .collect();
                app.lines(lines);
            }
            Err(e) => app.error(format!("✗ 读取元数据失败: {}", e)),
        },
        AppCommand::Help => app.lines(HELP_LINES.iter().map(|s| s.to_string()).collect()),
        AppCommand::Quit => return false,
        AppCommand::Unknown(msg) => {
            if !msg.is_empty() {
                app.error(msg);
            }
        }
    }
    true
}

async fn open(app: &mut App, dataset: &str) {
    if let Some(prev) = app.session.take() {
        app.warning(format!("已放弃 {} 的未保存修改", prev.dataset_id));
    }
    app.preview.clear();
    app.message(format!("正在打开 {}...", dataset));

    match app.service.start_session(dataset).await {
        Ok(start) => {
            for w in &start.warnings {
                app.warning(format!("⚠ {}", w));
            }
            match &start.prior_key {
                Some(key) => app.message(format!("✓ 已载入 {}", key)),
                None => app.message("未找到旧元数据，从空记录开始".to_string()),
            }
            app.message(format!(
                "✓ {}: {} 个可选列",
                start.session.dataset_id,
                start.session.available.len()
            ));
            info!("打开数据集 {}", start.session.dataset_key);
            app.preview = start.preview;
            app.session = Some(start.session);
        }
        Err(e) => {
            error!("打开数据集失败 {}: {}", dataset, e);
            app.error(format!("✗ 打开失败: {}", e));
        }
    }
}

fn show(app: &App) {
    let Some(session) = app.require_session() else {
        return;
    };
    let working = &session.working;
    let mut lines = vec![format!("# {} ({})", session.dataset_id, session.dataset_key)];
    match serde_json::to_string_pretty(&working.record.to_value()) {
        Ok(text) => lines.extend(text.lines().map(|l| l.to_string())),
        Err(e) => lines.push(format!("(无法显示: {})", e)),
    }
    if parse_access_level(&working.access_level_input).is_none() {
        lines.push(format!(
            "layer_access_level 输入未生效: {:?}",
            working.access_level_input
        ));
    }
    if parse_visualization(&working.visualization_input).is_err() {
        lines.push(format!(
            "visualization 输入未生效: {}",
            working.visualization_input
        ));
    }
    app.lines(lines);
}

fn apply(app: &mut App, edit: FieldEdit, label: &str) {
    let Some(session) = app.require_session() else {
        return;
    };
    match session.apply(edit) {
        Ok((next, warnings)) => {
            for w in &warnings {
                app.warning(format!("⚠ {}", w));
            }
            app.session = Some(next);
            app.message(format!("✓ 已更新 {}", label));
        }
        Err(e) => app.error(format!("✗ {}", e)),
    }
}

async fn save(app: &mut App) {
    let Some(session) = app.require_session() else {
        return;
    };
    match app.service.save(session).await {
        Ok(saved) => {
            for w in session.advisories() {
                app.warning(format!("⚠ {}", w));
            }
            let next = crate::session::EditSession {
                working: session.working.with_record(saved.record),
                ..session.clone()
            };
            app.session = Some(next);
            app.message(format!("✓ 已保存到 {}", saved.key));
        }
        Err(CurationError::Validation(issues)) => {
            app.error(format!("✗ 校验未通过，未保存 ({} 个问题)", issues.len()));
            app.lines(issues.iter().map(|i| format!("  - {}", i)).collect());
        }
        Err(e) => app.error(format!("✗ 保存失败: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_state::AppEvent;
    use crate::sampler::DEFAULT_SAMPLE_LIMIT;
    use crate::session::CurationService;
    use crate::storage::{BlobStore, ObjectBlobStore};
    use bytes::Bytes;
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    async fn app() -> (App, mpsc::UnboundedReceiver<AppEvent>, Arc<ObjectBlobStore>) {
        let store = Arc::new(ObjectBlobStore::in_memory());
        let body = json!({
            "type": "FeatureCollection",
            "features": [{"type": "Feature", "properties": {"pop": 10, "area": 2.5}}]
        });
        store
            .put("datasets/county_pop.json", Bytes::from(body.to_string()))
            .await
            .unwrap();
        let service = Arc::new(CurationService::new(store.clone(), DEFAULT_SAMPLE_LIMIT));
        let (tx, rx) = mpsc::unbounded_channel();
        (App::new(service, tx), rx, store)
    }

    async fn run(app: &mut App, line: &str) -> bool {
        handle(app, line.parse().unwrap()).await
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<AppEvent>) -> Vec<AppEvent> {
        let mut out = Vec::new();
        while let Ok(evt) = rx.try_recv() {
            out.push(evt);
        }
        out
    }

    #[tokio::test]
    async fn edit_requires_open_session() {
        let (mut app, mut rx, _) = app().await;
        assert!(run(&mut app, "set source USDA").await);
        let events = drain(&mut rx);
        assert!(matches!(events.as_slice(), [AppEvent::Error(_)]));
    }

    #[tokio::test]
    async fn open_edit_save_flow() {
        let (mut app, mut rx, store) = app().await;
        run(&mut app, "open county_pop").await;
        assert!(app.session.is_some());
        assert_eq!(app.preview.len(), 1);

        run(&mut app, "set obj_details_column id").await;
        run(&mut app, "set data_columns pop, area").await;
        run(&mut app, "column pop label Population").await;
        run(&mut app, "set layer_access_level five").await;
        drain(&mut rx);

        run(&mut app, "save").await;
        let events = drain(&mut rx);
        assert!(matches!(events.first(), Some(AppEvent::Error(_))));
        assert!(store.get("metadata/county_pop_metadata.json").await.is_err());

        run(&mut app, "set layer_access_level 0").await;
        run(&mut app, "save").await;
        let events = drain(&mut rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, AppEvent::Message(m) if m.contains("metadata/county_pop_metadata.json"))));

        let raw: serde_json::Value = serde_json::from_slice(
            &store.get("metadata/county_pop_metadata.json").await.unwrap(),
        )
        .unwrap();
        assert_eq!(raw["data_columns"], json!(["pop", "area", "geom"]));
        assert_eq!(raw["columns"][0]["label"], "Population");
        assert_eq!(raw["layer_access_level"], json!(0));
    }

    #[tokio::test]
    async fn unknown_tooltip_column_warns_but_saves() {
        let (mut app, mut rx, store) = app().await;
        run(&mut app, "open county_pop").await;
        run(&mut app, "set obj_details_column id").await;
        run(&mut app, "set tooltip-content {{density}} per km2").await;
        drain(&mut rx);

        run(&mut app, "save").await;
        let events = drain(&mut rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, AppEvent::Warning(m) if m.contains("density"))));
        assert!(!events.iter().any(|e| matches!(e, AppEvent::Error(_))));
        assert!(store.get("metadata/county_pop_metadata.json").await.is_ok());
    }

    #[tokio::test]
    async fn columns_lists_available_names() {
        let (mut app, mut rx, _) = app().await;
        run(&mut app, "open county_pop").await;
        drain(&mut rx);
        run(&mut app, "columns").await;
        assert_eq!(
            drain(&mut rx),
            vec![AppEvent::Lines(vec!["pop".into(), "area".into()])]
        );
    }

    #[tokio::test]
    async fn discard_and_quit() {
        let (mut app, mut rx, _) = app().await;
        run(&mut app, "open county_pop").await;
        run(&mut app, "discard").await;
        assert!(app.session.is_none());
        drain(&mut rx);
        assert!(!run(&mut app, "quit").await);
    }

    #[tokio::test]
    async fn unknown_dataset_reports_error() {
        let (mut app, mut rx, _) = app().await;
        run(&mut app, "open nope").await;
        assert!(app.session.is_none());
        let events = drain(&mut rx);
        assert!(matches!(events.last(), Some(AppEvent::Error(_))));
    }
}
