use super::{Record, RecordValue, Recorder};
use log::info;
use std::collections::BTreeMap;

/// Writes records through the [`log`] facade.
///
/// [`Recorder::write`] logs a record as one line. [`Recorder::flush`] logs the mean of
/// every scalar key over the records stored since the previous flush.
#[derive(Default)]
pub struct LogRecorder {
    stored: Vec<Record>,
}

impl LogRecorder {
    /// Constructs the recorder.
    pub fn new() -> Self {
        Self::default()
    }
}

fn format_value(value: &RecordValue) -> String {
    match value {
        RecordValue::Scalar(v) => format!("{:.3}", v),
        RecordValue::DateTime(t) => t.to_rfc3339(),
        RecordValue::Array1(v) => format!("{:?}", v),
        RecordValue::String(s) => s.clone(),
    }
}

impl Recorder for LogRecorder {
    fn write(&mut self, record: Record) {
        let fields: BTreeMap<_, _> = record
            .into_iter_in_record()
            .map(|(k, v)| (k, format_value(&v)))
            .collect();
        let line = fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ");
        info!("{}", line);
    }

    fn store(&mut self, record: Record) {
        self.stored.push(record);
    }

    fn flush(&mut self, step: i64) {
        if self.stored.is_empty() {
            return;
        }

        let mut sums: BTreeMap<String, (f32, usize)> = BTreeMap::new();
        for record in self.stored.drain(..) {
            for (k, v) in record.iter() {
                if let RecordValue::Scalar(v) = v {
                    let e = sums.entry(k.clone()).or_insert((0.0, 0));
                    e.0 += v;
                    e.1 += 1;
                }
            }
        }

        let line = sums
            .iter()
            .map(|(k, (sum, n))| format!("{}={:.3}", k, sum / *n as f32))
            .collect::<Vec<_>>()
            .join(" ");
        info!("[{}] {}", step, line);
    }
}
