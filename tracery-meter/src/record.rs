//! Marker record types and their compact line rendering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracery_chain::{TraceContext, TraceFlags, chain};

/// Severity level of a marker. Every operation accepts every level.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MarkerLevel {
    #[default]
    Debug,
    Info,
    Critical,
    Commercial,
    Max,
}

impl fmt::Display for MarkerLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Critical => "critical",
            Self::Commercial => "commercial",
            Self::Max => "max",
        };
        f.write_str(s)
    }
}

/// What a marker records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum MarkerPayload {
    /// Begin of a (name, task id) region.
    Begin { name: String, task_id: i32 },
    /// End of a (name, task id) region.
    End { name: String, task_id: i32 },
    /// Begin of a synchronous stack-like region.
    SyncBegin {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        args: Option<String>,
    },
    /// End of the innermost synchronous region with this name.
    SyncEnd { name: String },
    /// Begin of an asynchronous region; matched by (name, task id).
    AsyncBegin {
        name: String,
        task_id: i32,
        #[serde(skip_serializing_if = "Option::is_none")]
        category: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        args: Option<String>,
    },
    /// End of an asynchronous region; matched by (name, task id).
    AsyncEnd { name: String, task_id: i32 },
    /// Point-in-time numeric sample.
    Counter { name: String, value: i64 },
}

/// One marker, stamped with its origin process and, when available, the
/// chain installed at record time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerRecord {
    pub level: MarkerLevel,
    pub pid: u32,
    pub timestamp: DateTime<Utc>,
    /// Chain installed when the marker was recorded. Absent when no valid
    /// chain was installed or the chain opted out via
    /// [`TraceFlags::DONOT_ENABLE_LOG`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<TraceContext>,
    pub payload: MarkerPayload,
}

impl MarkerRecord {
    /// Build a record, stamping pid, timestamp, and the current chain.
    #[must_use]
    pub fn new(level: MarkerLevel, payload: MarkerPayload) -> Self {
        let current = chain::current();
        let chain = (current.is_valid()
            && !current.flags.contains(TraceFlags::DONOT_ENABLE_LOG))
        .then_some(current);
        Self {
            level,
            pid: std::process::id(),
            timestamp: Utc::now(),
            chain,
            payload,
        }
    }

    /// Render the compact marker line.
    ///
    /// Begin-style lines carry an `H:` section naming the region; when a
    /// chain is stamped it is prefixed as `[chain,span,parent]#` in hex.
    #[must_use]
    pub fn format(&self) -> String {
        let pid = self.pid;
        match &self.payload {
            MarkerPayload::Begin { name, task_id } => {
                format!("B|{pid}|H:{} {task_id}", self.stamped(name))
            }
            MarkerPayload::End { name, task_id } => {
                format!("E|{pid}|H:{name} {task_id}")
            }
            MarkerPayload::SyncBegin { name, args } => match args {
                Some(args) if !args.is_empty() => {
                    format!("B|{pid}|H:{}|{args}", self.stamped(name))
                }
                _ => format!("B|{pid}|H:{}", self.stamped(name)),
            },
            MarkerPayload::SyncEnd { .. } => format!("E|{pid}|"),
            MarkerPayload::AsyncBegin {
                name,
                task_id,
                category,
                args,
            } => {
                let mut line = format!("S|{pid}|H:{} {task_id}", self.stamped(name));
                if let Some(category) = category.as_deref().filter(|c| !c.is_empty()) {
                    line.push('|');
                    line.push_str(category);
                }
                if let Some(args) = args.as_deref().filter(|a| !a.is_empty()) {
                    line.push('|');
                    line.push_str(args);
                }
                line
            }
            MarkerPayload::AsyncEnd { name, task_id } => {
                format!("F|{pid}|H:{name} {task_id}")
            }
            MarkerPayload::Counter { name, value } => {
                format!("C|{pid}|{name} {value}")
            }
        }
    }

    fn stamped(&self, name: &str) -> String {
        match &self.chain {
            Some(ctx) => format!(
                "[{:x},{:x},{:x}]#{name}",
                ctx.chain_id.0, ctx.span_id.0, ctx.parent_span_id.0
            ),
            None => name.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracery_chain::{ChainId, SpanId};

    fn bare(level: MarkerLevel, payload: MarkerPayload) -> MarkerRecord {
        MarkerRecord {
            level,
            pid: 1234,
            timestamp: Utc::now(),
            chain: None,
            payload,
        }
    }

    #[test]
    fn levels_are_ordered() {
        assert!(MarkerLevel::Debug < MarkerLevel::Info);
        assert!(MarkerLevel::Info < MarkerLevel::Critical);
        assert!(MarkerLevel::Critical < MarkerLevel::Commercial);
        assert!(MarkerLevel::Commercial < MarkerLevel::Max);
        assert_eq!(MarkerLevel::default(), MarkerLevel::Debug);
    }

    #[test]
    fn begin_line_carries_task_id() {
        let record = bare(
            MarkerLevel::Debug,
            MarkerPayload::Begin {
                name: "load".into(),
                task_id: 199,
            },
        );
        assert_eq!(record.format(), "B|1234|H:load 199");
    }

    #[test]
    fn sync_lines_render_begin_and_end() {
        let begin = bare(
            MarkerLevel::Info,
            MarkerPayload::SyncBegin {
                name: "parse".into(),
                args: None,
            },
        );
        assert_eq!(begin.format(), "B|1234|H:parse");
        let with_args = bare(
            MarkerLevel::Info,
            MarkerPayload::SyncBegin {
                name: "parse".into(),
                args: Some("key=1".into()),
            },
        );
        assert_eq!(with_args.format(), "B|1234|H:parse|key=1");
        let end = bare(MarkerLevel::Info, MarkerPayload::SyncEnd { name: "parse".into() });
        assert_eq!(end.format(), "E|1234|");
    }

    #[test]
    fn async_lines_render_category_and_args() {
        let begin = bare(
            MarkerLevel::Commercial,
            MarkerPayload::AsyncBegin {
                name: "download".into(),
                task_id: 7,
                category: Some("net".into()),
                args: Some("url=x".into()),
            },
        );
        assert_eq!(begin.format(), "S|1234|H:download 7|net|url=x");
        let finish = bare(
            MarkerLevel::Commercial,
            MarkerPayload::AsyncEnd {
                name: "download".into(),
                task_id: 7,
            },
        );
        assert_eq!(finish.format(), "F|1234|H:download 7");
    }

    #[test]
    fn empty_category_and_args_are_dropped() {
        let begin = bare(
            MarkerLevel::Debug,
            MarkerPayload::AsyncBegin {
                name: "idle".into(),
                task_id: 0,
                category: Some(String::new()),
                args: Some(String::new()),
            },
        );
        assert_eq!(begin.format(), "S|1234|H:idle 0");
    }

    #[test]
    fn counter_line_renders_value() {
        let record = bare(
            MarkerLevel::Debug,
            MarkerPayload::Counter {
                name: "queue_depth".into(),
                value: -3,
            },
        );
        assert_eq!(record.format(), "C|1234|queue_depth -3");
    }

    #[test]
    fn chain_stamp_prefixes_begin_names() {
        let mut record = bare(
            MarkerLevel::Debug,
            MarkerPayload::SyncBegin {
                name: "work".into(),
                args: None,
            },
        );
        record.chain = Some(TraceContext {
            chain_id: ChainId(0xabc),
            parent_span_id: SpanId(0),
            span_id: SpanId(0x2a),
            flags: TraceFlags::empty(),
        });
        assert_eq!(record.format(), "B|1234|H:[abc,2a,0]#work");
    }

    #[test]
    fn new_without_installed_chain_has_no_stamp() {
        std::thread::scope(|s| {
            s.spawn(|| {
                let record = MarkerRecord::new(
                    MarkerLevel::Debug,
                    MarkerPayload::SyncEnd { name: "x".into() },
                );
                assert!(record.chain.is_none());
                assert_eq!(record.pid, std::process::id());
            })
            .join()
            .expect("test thread panicked");
        });
    }

    #[test]
    fn new_stamps_installed_chain() {
        std::thread::scope(|s| {
            s.spawn(|| {
                let ctx = chain::begin("stamped");
                let record = MarkerRecord::new(
                    MarkerLevel::Info,
                    MarkerPayload::SyncBegin {
                        name: "x".into(),
                        args: None,
                    },
                );
                assert_eq!(record.chain, Some(ctx));
                chain::end(&ctx);
            })
            .join()
            .expect("test thread panicked");
        });
    }

    #[test]
    fn donot_enable_log_suppresses_stamp() {
        std::thread::scope(|s| {
            s.spawn(|| {
                let ctx = chain::begin_with_flags("quiet", TraceFlags::DONOT_ENABLE_LOG);
                let record = MarkerRecord::new(
                    MarkerLevel::Debug,
                    MarkerPayload::Counter {
                        name: "n".into(),
                        value: 1,
                    },
                );
                assert!(record.chain.is_none());
                chain::end(&ctx);
            })
            .join()
            .expect("test thread panicked");
        });
    }

    #[test]
    fn record_serializes_with_tagged_payload() {
        let record = bare(
            MarkerLevel::Max,
            MarkerPayload::AsyncEnd {
                name: "flush".into(),
                task_id: 3,
            },
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["level"], "max");
        assert_eq!(json["payload"]["kind"], "async_end");
        assert_eq!(json["payload"]["task_id"], 3);
    }
}
