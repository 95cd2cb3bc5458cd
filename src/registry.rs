//! ロケーション台帳（location_data.js）の読み書き
//!
//! 台帳は次の形の JavaScript オブジェクトリテラル:
//!
//! ```text
//! const imageLocations = {
//!   "project-1.jpg": "티오더(t'order) 본사",
//!   "project-2.jpg": "TBF",
//! };
//! ```
//!
//! `{` より前と最後の `}` より後ろはそのまま保持し、書き出し時に戻す。
//! 末尾カンマ付きの記法を読み込み時に許容し、書き出しでは各行に末尾カンマを付ける。
//! JSON として読めない台帳は行単位で復旧し、エントリとして解釈できない行（コメントなど）は
//! そのままの内容で書き戻す。

use crate::asset::{parse_asset_id, IdRange};
use crate::error::{GallerySyncError, Result};
use regex::Regex;
use std::path::Path;

const DEFAULT_PREFIX: &str = "const imageLocations = ";
const DEFAULT_SUFFIX: &str = ";\n";

lazy_static::lazy_static! {
    // 1行1エントリ（復旧用）
    static ref ENTRY_LINE_RE: Regex =
        Regex::new(r#"^\s*"((?:[^"\\]|\\.)*)"\s*:\s*"((?:[^"\\]|\\.)*)"\s*,?\s*$"#).unwrap();
}

/// 台帳の1エントリ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    pub file_name: String,
    pub label: String,
}

/// 台帳本体の1行
#[derive(Debug, Clone, PartialEq, Eq)]
enum RegistryItem {
    Entry(RegistryEntry),
    /// 解釈できなかった行（書き出し時にそのまま戻す）
    Verbatim(String),
}

/// ファイル名 → ロケーション名の順序付きマップ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationRegistry {
    prefix: String,
    items: Vec<RegistryItem>,
    suffix: String,
}

/// 読み込み結果
#[derive(Debug, Clone)]
pub struct ParsedRegistry {
    pub registry: LocationRegistry,
    /// 厳密な解析に失敗し行単位で復旧した場合の、解釈できずそのまま残した行数
    pub recovered_lines: Option<usize>,
}

impl Default for LocationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationRegistry {
    /// 空の台帳
    pub fn new() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            items: Vec::new(),
            suffix: DEFAULT_SUFFIX.to_string(),
        }
    }

    /// 台帳テキストを解析
    pub fn parse(text: &str) -> Result<ParsedRegistry> {
        let start = text
            .find('{')
            .ok_or_else(|| GallerySyncError::RegistryFormat("開き括弧 `{` が見つかりません".into()))?;
        let end = text
            .rfind('}')
            .filter(|&end| end > start)
            .ok_or_else(|| GallerySyncError::RegistryFormat("閉じ括弧 `}` が見つかりません".into()))?;

        let mut registry = Self {
            prefix: text[..start].to_string(),
            items: Vec::new(),
            suffix: text[end + 1..].to_string(),
        };
        let body = &text[start..=end];

        let recovered_lines = match parse_strict(body) {
            Ok(entries) => {
                // 重複キーは後勝ち
                registry.extend(entries);
                None
            }
            Err(e) => {
                tracing::warn!("台帳をJSONとして解析できません（{}）。行単位で復旧します", e);
                let mut kept = 0;
                for item in parse_lines(&text[start + 1..end]) {
                    match item {
                        RegistryItem::Entry(entry) => registry.insert(entry.file_name, entry.label),
                        verbatim => {
                            kept += 1;
                            registry.items.push(verbatim);
                        }
                    }
                }
                Some(kept)
            }
        };

        Ok(ParsedRegistry {
            registry,
            recovered_lines,
        })
    }

    /// ファイルから読み込み（存在しなければ空の台帳）
    pub fn load(path: &Path) -> Result<ParsedRegistry> {
        if !path.exists() {
            return Ok(ParsedRegistry {
                registry: Self::new(),
                recovered_lines: None,
            });
        }
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// ファイルへ書き出し（一時ファイル経由で置き換え）
    pub fn save(&self, path: &Path) -> Result<()> {
        write_replacing(path, &self.render())
    }

    /// エントリを並び順に列挙
    pub fn entries(&self) -> impl Iterator<Item = &RegistryEntry> + '_ {
        self.items.iter().filter_map(|item| match item {
            RegistryItem::Entry(entry) => Some(entry),
            RegistryItem::Verbatim(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries().count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().next().is_none()
    }

    pub fn get(&self, file_name: &str) -> Option<&str> {
        self.entries()
            .find(|e| e.file_name == file_name)
            .map(|e| e.label.as_str())
    }

    pub fn contains(&self, file_name: &str) -> bool {
        self.get(file_name).is_some()
    }

    /// エントリを追加（既存キーは位置を保ったまま値を置き換える）
    pub fn insert(&mut self, file_name: impl Into<String>, label: impl Into<String>) {
        let file_name = file_name.into();
        let label = label.into();
        let position = self
            .items
            .iter()
            .position(|item| matches!(item, RegistryItem::Entry(e) if e.file_name == file_name));
        match position {
            Some(i) => {
                if let RegistryItem::Entry(entry) = &mut self.items[i] {
                    entry.label = label;
                }
            }
            None => self.items.push(RegistryItem::Entry(RegistryEntry { file_name, label })),
        }
    }

    pub fn extend<I, K, V>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (file_name, label) in pairs {
            self.insert(file_name, label);
        }
    }

    /// 番号が範囲内のエントリを削除し、削除件数を返す
    pub fn remove_range(&mut self, range: IdRange) -> usize {
        let before = self.items.len();
        self.items.retain(|item| match item {
            RegistryItem::Entry(entry) => {
                !parse_asset_id(&entry.file_name).is_some_and(|id| range.contains(id))
            }
            RegistryItem::Verbatim(_) => true,
        });
        before - self.items.len()
    }

    /// 範囲内の古いエントリを消してから新しいエントリを追加
    pub fn replace_range<I, K, V>(&mut self, range: IdRange, pairs: I) -> usize
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let removed = self.remove_range(range);
        self.extend(pairs);
        removed
    }

    /// 台帳テキストを生成
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.prefix.len() + self.suffix.len() + self.items.len() * 48);
        out.push_str(&self.prefix);
        out.push_str("{\n");
        for item in &self.items {
            match item {
                RegistryItem::Entry(entry) => {
                    out.push_str("  ");
                    out.push_str(&quote(&entry.file_name));
                    out.push_str(": ");
                    out.push_str(&quote(&entry.label));
                    out.push_str(",\n");
                }
                RegistryItem::Verbatim(line) => {
                    out.push_str(line);
                    out.push('\n');
                }
            }
        }
        out.push('}');
        out.push_str(&self.suffix);
        out
    }
}

/// JSON 文字列としてクォート（非ASCIIはそのまま）
fn quote(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn unquote(raw: &str) -> Option<String> {
    serde_json::from_str::<String>(&format!("\"{}\"", raw)).ok()
}

/// 文字列リテラルの外にある、`}` / `]` 直前の末尾カンマを取り除く
fn strip_trailing_commas(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut chars = body.char_indices().peekable();

    while let Some((i, ch)) = chars.next() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            out.push(ch);
            continue;
        }

        match ch {
            '"' => {
                in_string = true;
                out.push(ch);
            }
            ',' => {
                let next = body[i + 1..].trim_start().chars().next();
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(ch);
                }
            }
            _ => out.push(ch),
        }
    }

    out
}

/// 末尾カンマを除去して JSON オブジェクトとして解析
fn parse_strict(body: &str) -> std::result::Result<Vec<(String, String)>, String> {
    let cleaned = strip_trailing_commas(body);
    let map: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&cleaned).map_err(|e| e.to_string())?;

    map.into_iter()
        .map(|(key, value)| match value {
            serde_json::Value::String(label) => Ok((key, label)),
            other => Err(format!("{} の値が文字列ではありません: {}", key, other)),
        })
        .collect()
}

/// 括弧の内側を行単位で読む
///
/// `"key": "value",` の行はエントリに、空行以外の残りはそのままの行として返す。
fn parse_lines(inner: &str) -> Vec<RegistryItem> {
    let mut items = Vec::new();

    for line in inner.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let parsed = ENTRY_LINE_RE.captures(line).and_then(|cap| {
            let file_name = unquote(&cap[1])?;
            let label = unquote(&cap[2])?;
            Some(RegistryEntry { file_name, label })
        });
        match parsed {
            Some(entry) => items.push(RegistryItem::Entry(entry)),
            None => {
                tracing::warn!("台帳の行を解釈できないためそのまま残します: {}", line.trim());
                items.push(RegistryItem::Verbatim(line.trim_end().to_string()));
            }
        }
    }

    items
}

/// 一時ファイルに書いてから置き換える
pub(crate) fn write_replacing(path: &Path, content: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
