//! Tolerant parsing of the schema section's free-text generator payload.
//!
//! Toolchains write this payload as a Python dictionary literal: single-quoted
//! strings, `True`/`False`/`None`, tuples, trailing commas. Parsing is
//! best-effort: a literal parse first, then a quote/keyword normalization
//! retried as strict JSON, and otherwise no generator metadata at all.

use std::collections::BTreeMap;

use rknn_core::{DataType, QuantInfo};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Per-tensor layout attributes from the generator `attrs` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorAttrs {
    #[serde(default)]
    pub layout: Option<String>,
    #[serde(default, alias = "original_layout")]
    pub layout_ori: Option<String>,
}

/// Per-tensor entry of the generator `quant_tab` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuantEntry {
    #[serde(default)]
    pub dtype: Option<DataType>,
    #[serde(default, alias = "method")]
    pub quant_method: Option<String>,
    #[serde(default, alias = "qtype")]
    pub quant_type: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub scale: Vec<f64>,
    #[serde(default, deserialize_with = "zero_points")]
    pub zero_point: Vec<i64>,
}

impl QuantEntry {
    pub fn quant_info(&self) -> QuantInfo {
        QuantInfo {
            method: self.quant_method.clone(),
            qtype: self.quant_type.clone(),
            scale: self.scale.clone(),
            zero_point: self.zero_point.clone(),
        }
    }
}

/// Parsed generator payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GeneratorInfo {
    /// The whole mapping as parsed.
    pub raw: Map<String, Value>,
    pub attrs: BTreeMap<String, TensorAttrs>,
    pub quant_tab: BTreeMap<String, QuantEntry>,
}

/// Parse a generator payload. Never fails; `None` means absent.
pub fn parse_generator(text: &str) -> Option<GeneratorInfo> {
    let value = match parse_python_literal(text) {
        Some(value) => value,
        None => match serde_json::from_str::<Value>(&normalize(text)) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("generator payload is neither a literal nor JSON ({e}); ignoring it");
                return None;
            }
        },
    };
    let Value::Object(raw) = value else {
        tracing::warn!("generator payload is not a mapping; ignoring it");
        return None;
    };

    let attrs = typed_table::<TensorAttrs>(raw.get("attrs"), "attrs");
    let quant_tab = typed_table::<QuantEntry>(raw.get("quant_tab"), "quant_tab");
    Some(GeneratorInfo {
        raw,
        attrs,
        quant_tab,
    })
}

/// Rewrite Python literal syntax into JSON syntax.
pub fn normalize(text: &str) -> String {
    text.replace('\'', "\"")
        .replace("True", "true")
        .replace("False", "false")
        .replace("None", "null")
}

fn typed_table<T: for<'de> Deserialize<'de>>(
    table: Option<&Value>,
    label: &str,
) -> BTreeMap<String, T> {
    let Some(Value::Object(entries)) = table else {
        return BTreeMap::new();
    };
    entries
        .iter()
        .filter_map(|(tensor, entry)| match serde_json::from_value(entry.clone()) {
            Ok(parsed) => Some((tensor.clone(), parsed)),
            Err(e) => {
                tracing::debug!("skipping {label} entry '{tensor}': {e}");
                None
            }
        })
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match Option::<OneOrMany<T>>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(v)) => vec![v],
        Some(OneOrMany::Many(v)) => v,
    })
}

/// Integer zero points stay exact; float ones (`-128.0`) are rounded.
#[derive(Deserialize)]
#[serde(untagged)]
enum ZeroPoint {
    Int(i64),
    Float(f64),
}

fn zero_points<'de, D>(deserializer: D) -> Result<Vec<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let points: Vec<ZeroPoint> = one_or_many(deserializer)?;
    Ok(points
        .into_iter()
        .map(|z| match z {
            ZeroPoint::Int(v) => v,
            ZeroPoint::Float(v) => v.round() as i64,
        })
        .collect())
}

/// Parse a Python literal (dict, list, tuple, str, int, float, bool, None)
/// into a JSON value. `None` on any syntax error or trailing input.
pub fn parse_python_literal(text: &str) -> Option<Value> {
    let mut p = LiteralParser {
        src: text.as_bytes(),
        pos: 0,
    };
    let value = p.value()?;
    p.skip_ws();
    (p.pos == p.src.len()).then_some(value)
}

struct LiteralParser<'a> {
    src: &'a [u8],
    pos: usize,
}

impl LiteralParser<'_> {
    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, byte: u8) -> bool {
        self.skip_ws();
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn value(&mut self) -> Option<Value> {
        self.skip_ws();
        match self.peek()? {
            b'{' => self.dict(),
            b'[' => self.sequence(b']'),
            b'(' => self.sequence(b')'),
            b'\'' | b'"' => self.string().map(Value::String),
            b'-' | b'+' | b'.' | b'0'..=b'9' => self.number(),
            _ => self.keyword(),
        }
    }

    fn dict(&mut self) -> Option<Value> {
        self.pos += 1;
        let mut map = Map::new();
        loop {
            if self.eat(b'}') {
                return Some(Value::Object(map));
            }
            let key = match self.value()? {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            if !self.eat(b':') {
                return None;
            }
            let value = self.value()?;
            map.insert(key, value);
            if !self.eat(b',') {
                return self.eat(b'}').then_some(Value::Object(map));
            }
        }
    }

    fn sequence(&mut self, close: u8) -> Option<Value> {
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            if self.eat(close) {
                return Some(Value::Array(items));
            }
            items.push(self.value()?);
            if !self.eat(b',') {
                return self.eat(close).then_some(Value::Array(items));
            }
        }
    }

    fn string(&mut self) -> Option<String> {
        let quote = self.peek()?;
        self.pos += 1;
        let mut out = Vec::new();
        loop {
            let b = self.peek()?;
            self.pos += 1;
            match b {
                _ if b == quote => break,
                b'\\' => {
                    let esc = self.peek()?;
                    self.pos += 1;
                    match esc {
                        b'n' => out.push(b'\n'),
                        b't' => out.push(b'\t'),
                        b'r' => out.push(b'\r'),
                        b'0' => out.push(0),
                        b'x' => {
                            let c = self.hex_escape(2)?;
                            out.extend_from_slice(c.encode_utf8(&mut [0; 4]).as_bytes());
                        }
                        b'u' => {
                            let c = self.hex_escape(4)?;
                            out.extend_from_slice(c.encode_utf8(&mut [0; 4]).as_bytes());
                        }
                        b'\\' | b'\'' | b'"' => out.push(esc),
                        other => out.extend_from_slice(&[b'\\', other]),
                    }
                }
                _ => out.push(b),
            }
        }
        String::from_utf8(out).ok()
    }

    fn hex_escape(&mut self, digits: usize) -> Option<char> {
        let end = self.pos.checked_add(digits)?;
        let hex = std::str::from_utf8(self.src.get(self.pos..end)?).ok()?;
        self.pos = end;
        char::from_u32(u32::from_str_radix(hex, 16).ok()?)
    }

    fn number(&mut self) -> Option<Value> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.' | b'e' | b'E'))
        {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).ok()?;
        let text = text.strip_prefix('+').unwrap_or(text);
        if let Ok(int) = text.parse::<i64>() {
            return Some(Value::Number(int.into()));
        }
        let float = text.parse::<f64>().ok()?;
        Number::from_f64(float).map(Value::Number)
    }

    fn keyword(&mut self) -> Option<Value> {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_') {
            self.pos += 1;
        }
        match &self.src[start..self.pos] {
            b"True" | b"true" => Some(Value::Bool(true)),
            b"False" | b"false" => Some(Value::Bool(false)),
            b"None" | b"null" => Some(Value::Null),
            _ => None,
        }
    }
}
