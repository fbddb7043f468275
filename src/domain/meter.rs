// ============================================================
// Layer 3 — AverageMeter
// ============================================================
// Tracks the latest value and the running average of a
// quantity over an epoch (batch time, loss, accuracy).
//
// Each update carries a weight `n` (usually the batch size),
// so the average is a per-sample mean even when the last
// batch of an epoch is smaller than the rest.
//
//   sum   += val * n
//   count += n
//   avg    = sum / count

use std::fmt;

/// How a meter renders its numbers in progress lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeterFormat {
    /// `{:width.precision}` e.g. `6.3` → ` 0.125`
    Fixed { width: usize, precision: usize },
    /// `{:.precision e}` with a signed two-digit exponent,
    /// e.g. `.4e` → `1.2346e-01`
    Scientific { precision: usize },
}

impl MeterFormat {
    fn render(&self, v: f64) -> String {
        match *self {
            MeterFormat::Fixed { width, precision } => {
                format!("{:>width$.precision$}", v, width = width, precision = precision)
            }
            MeterFormat::Scientific { precision } => {
                let plain = format!("{:.precision$e}", v, precision = precision);
                match plain.split_once('e') {
                    Some((mantissa, exp)) => {
                        let (sign, digits) = match exp.strip_prefix('-') {
                            Some(digits) => ('-', digits),
                            None => ('+', exp),
                        };
                        format!("{mantissa}e{sign}{digits:0>2}")
                    }
                    // NaN and inf carry no exponent
                    None => plain,
                }
            }
        }
    }
}

/// Computes and stores the average and current value.
#[derive(Debug, Clone)]
pub struct AverageMeter {
    pub name:   String,
    pub format: MeterFormat,
    pub val:    f64,
    pub sum:    f64,
    pub count:  usize,
    pub avg:    f64,
}

impl AverageMeter {
    pub fn new(name: impl Into<String>, format: MeterFormat) -> Self {
        Self {
            name:  name.into(),
            format,
            val:   0.0,
            sum:   0.0,
            count: 0,
            avg:   0.0,
        }
    }

    /// Wall-clock seconds per batch.
    pub fn time() -> Self {
        Self::new("Time", MeterFormat::Fixed { width: 6, precision: 3 })
    }

    pub fn loss() -> Self {
        Self::new("Loss", MeterFormat::Scientific { precision: 4 })
    }

    pub fn top1() -> Self {
        Self::new("Acc@1", MeterFormat::Fixed { width: 6, precision: 2 })
    }

    /// `val (avg)` at a fixed precision, as used in progress lines.
    pub fn val_avg(&self, precision: usize) -> String {
        format!("{:.p$} ({:.p$})", self.val, self.avg, p = precision)
    }

    pub fn reset(&mut self) {
        self.val   = 0.0;
        self.sum   = 0.0;
        self.count = 0;
        self.avg   = 0.0;
    }

    /// Record `val` observed over `n` samples.
    pub fn update(&mut self, val: f64, n: usize) {
        self.val = val;
        if n == 0 {
            return;
        }
        self.sum   += val * n as f64;
        self.count += n;
        self.avg    = self.sum / self.count as f64;
    }
}

impl fmt::Display for AverageMeter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({})",
            self.name,
            self.format.render(self.val),
            self.format.render(self.avg),
        )
    }
}
