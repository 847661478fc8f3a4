use crate::session::{CurationService, EditSession};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    Message(String),
    Warning(String),
    Error(String),
    /// 多行输出（记录、列、预览表）
    Lines(Vec<String>),
}

pub struct App {
    pub service: Arc<CurationService>,
    pub session: Option<EditSession>,
    /// 打开数据集时采样的前几行
    pub preview: Vec<Map<String, Value>>,
    pub evt_tx: mpsc::UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(service: Arc<CurationService>, evt_tx: mpsc::UnboundedSender<AppEvent>) -> App {
        App {
            service,
            session: None,
            preview: Vec::new(),
            evt_tx,
        }
    }

    pub fn message(&self, msg: String) {
        let _ = self.evt_tx.send(AppEvent::Message(msg));
    }

    pub fn warning(&self, msg: String) {
        let _ = self.evt_tx.send(AppEvent::Warning(msg));
    }

    pub fn error(&self, msg: String) {
        let _ = self.evt_tx.send(AppEvent::Error(msg));
    }

    pub fn lines(&self, lines: Vec<String>) {
        let _ = self.evt_tx.send(AppEvent::Lines(lines));
    }

    /// 当前会话；没有打开数据集时发送错误并返回 None
    pub fn require_session(&self) -> Option<&EditSession> {
        if self.session.is_none() {
            self.error("没有打开的数据集，先执行 open <dataset>".to_string());
        }
        self.session.as_ref()
    }
}
