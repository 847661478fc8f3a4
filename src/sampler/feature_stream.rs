//! 增量扫描 GeoJSON FeatureCollection：逐块喂入字节，找到顶层 `features` 数组后
//! 每凑齐一个完整的 feature 就解析出来，不需要把整个对象读进内存。

use serde_json::Value;

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum Phase {
    Start,
    Root,
    Features,
    Done,
}

pub struct FeatureScanner {
    phase: Phase,
    /// Start 阶段已读入的字节数
    leading: usize,
    /// 其中匹配 BOM 前缀的字节数
    bom_seen: usize,
    depth: usize,
    in_string: bool,
    escape: bool,
    expect_key: bool,
    reading_key: bool,
    key_buf: Vec<u8>,
    last_key: Vec<u8>,
    in_item: bool,
    item: Vec<u8>,
    parsed: usize,
}

impl Default for FeatureScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureScanner {
    pub fn new() -> Self {
        Self {
            phase: Phase::Start,
            leading: 0,
            bom_seen: 0,
            depth: 0,
            in_string: false,
            escape: false,
            expect_key: false,
            reading_key: false,
            key_buf: Vec::new(),
            last_key: Vec::new(),
            in_item: false,
            item: Vec::new(),
            parsed: 0,
        }
    }

    /// features 数组已经闭合
    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    /// 喂入一块字节，最多返回 `want` 个完整的 feature。
    /// 达到 `want` 后剩余字节被忽略，调用方应停止读取。
    pub fn feed(&mut self, chunk: &[u8], want: usize) -> Result<Vec<Value>, String> {
        let mut out = Vec::new();
        for &b in chunk {
            if out.len() >= want {
                break;
            }
            match self.phase {
                Phase::Done => break,
                Phase::Start => self.step_start(b)?,
                Phase::Root => self.step_root(b)?,
                Phase::Features => {
                    if let Some(v) = self.step_features(b)? {
                        out.push(v);
                    }
                }
            }
        }
        Ok(out)
    }

    /// 流结束时调用：数组未闭合说明数据被截断
    pub fn finish(&self) -> Result<(), String> {
        match self.phase {
            Phase::Done => Ok(()),
            Phase::Start => Err("empty document".to_string()),
            Phase::Root => Err("no top-level features array".to_string()),
            Phase::Features => Err(format!(
                "feature collection truncated after {} features",
                self.parsed
            )),
        }
    }

    fn step_start(&mut self, b: u8) -> Result<(), String> {
        // 开头可能带 UTF-8 BOM
        if self.leading == self.bom_seen
            && self.bom_seen < UTF8_BOM.len()
            && b == UTF8_BOM[self.bom_seen]
        {
            self.leading += 1;
            self.bom_seen += 1;
            return Ok(());
        }
        if self.bom_seen > 0 && self.bom_seen < UTF8_BOM.len() {
            return Err("incomplete byte order mark".to_string());
        }
        self.leading += 1;
        if b.is_ascii_whitespace() {
            return Ok(());
        }
        if b == b'{' {
            self.phase = Phase::Root;
            self.depth = 1;
            self.expect_key = true;
            return Ok(());
        }
        Err("document is not a JSON object".to_string())
    }

    fn step_root(&mut self, b: u8) -> Result<(), String> {
        if self.in_string {
            if self.escape {
                self.escape = false;
            } else if b == b'\\' {
                self.escape = true;
            } else if b == b'"' {
                self.in_string = false;
                if self.reading_key {
                    self.reading_key = false;
                    self.last_key = std::mem::take(&mut self.key_buf);
                }
                return Ok(());
            }
            if self.reading_key {
                self.key_buf.push(b);
            }
            return Ok(());
        }

        match b {
            b'"' => {
                self.in_string = true;
                if self.depth == 1 && self.expect_key {
                    self.reading_key = true;
                    self.expect_key = false;
                    self.key_buf.clear();
                }
            }
            b',' if self.depth == 1 => self.expect_key = true,
            b'[' => {
                self.depth += 1;
                if self.depth == 2 && self.last_key == b"features" {
                    self.phase = Phase::Features;
                }
            }
            b'{' => self.depth += 1,
            b'}' | b']' => {
                self.depth -= 1;
                if self.depth == 0 {
                    return Err("no top-level features array".to_string());
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn step_features(&mut self, b: u8) -> Result<Option<Value>, String> {
        if !self.in_item {
            return match b {
                b',' => Ok(None),
                b'{' => {
                    self.in_item = true;
                    self.depth = 3;
                    self.item.clear();
                    self.item.push(b);
                    Ok(None)
                }
                b']' => {
                    self.depth = 1;
                    self.phase = Phase::Done;
                    Ok(None)
                }
                _ if b.is_ascii_whitespace() => Ok(None),
                _ => Err(format!("feature #{} is not an object", self.parsed)),
            };
        }

        self.item.push(b);
        if self.in_string {
            if self.escape {
                self.escape = false;
            } else if b == b'\\' {
                self.escape = true;
            } else if b == b'"' {
                self.in_string = false;
            }
            return Ok(None);
        }

        match b {
            b'"' => self.in_string = true,
            b'{' | b'[' => self.depth += 1,
            b'}' | b']' => {
                self.depth -= 1;
                if self.depth == 2 {
                    self.in_item = false;
                    let bytes = std::mem::take(&mut self.item);
                    let value: Value = serde_json::from_slice(&bytes)
                        .map_err(|e| format!("feature #{}: {}", self.parsed, e))?;
                    self.parsed += 1;
                    return Ok(Some(value));
                }
            }
            _ => {}
        }
        Ok(None)
    }
}
