use polyreg_core::RegressionResult;
use polyreg_linear::{TracePoint, TraceSink};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes `iteration cost` lines under a `#Iteration  #Cost` header.
pub struct CostTraceWriter<W: Write> {
    out: W,
}

impl<W: Write> CostTraceWriter<W> {
    pub fn new(mut out: W) -> RegressionResult<Self> {
        writeln!(out, "#Iteration  #Cost")?;
        Ok(CostTraceWriter { out })
    }

    pub fn flush(&mut self) -> RegressionResult<()> {
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl CostTraceWriter<BufWriter<File>> {
    /// Create or truncate `path`.
    pub fn create(path: impl AsRef<Path>) -> RegressionResult<Self> {
        Self::new(BufWriter::new(File::create(path)?))
    }
}

impl<W: Write> TraceSink for CostTraceWriter<W> {
    fn record(&mut self, point: TracePoint) -> RegressionResult<()> {
        writeln!(self.out, "{} {}", point.iteration, point.cost)?;
        Ok(())
    }
}

/// Writes the final cost of each fit against its L2 penalty, under `#Lamda  #Cost`.
pub struct PenaltySweepWriter<W: Write> {
    out: W,
}

impl<W: Write> PenaltySweepWriter<W> {
    pub fn new(mut out: W) -> RegressionResult<Self> {
        writeln!(out, "#Lamda  #Cost")?;
        Ok(PenaltySweepWriter { out })
    }

    pub fn record(&mut self, l2_penalty: f64, cost: f64) -> RegressionResult<()> {
        writeln!(self.out, "{} {}", l2_penalty, cost)?;
        Ok(())
    }

    pub fn flush(&mut self) -> RegressionResult<()> {
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl PenaltySweepWriter<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> RegressionResult<Self> {
        Self::new(BufWriter::new(File::create(path)?))
    }
}
