use crate::{
    error::{Error, Result},
    vector::Double4,
};
use serde::{Deserialize, Serialize};
use std::{fs::File, io::Write, path::Path};

/// One logged position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryRow {
    /// Simulated time.
    pub time: f64,
    /// Index of the body.
    #[serde(rename = "bodyId")]
    pub body_id: usize,
    /// X coordinate.
    #[serde(rename = "xPosition")]
    pub x: f64,
    /// Y coordinate.
    #[serde(rename = "yPosition")]
    pub y: f64,
    /// Z coordinate.
    #[serde(rename = "zPosition")]
    pub z: f64,
}

/// Destination of the logged trajectories.
pub trait TrajectorySink {
    /// Records the position of `body` at `time`.
    fn record(&mut self, time: f64, body: usize, position: [f64; 3]) -> Result<()>;

    /// Flushes buffered rows.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl TrajectorySink for Vec<TrajectoryRow> {
    #[inline]
    fn record(&mut self, time: f64, body: usize, [x, y, z]: [f64; 3]) -> Result<()> {
        self.push(TrajectoryRow {
            time,
            body_id: body,
            x,
            y,
            z,
        });
        Ok(())
    }
}

impl<S: TrajectorySink + ?Sized> TrajectorySink for &mut S {
    #[inline]
    fn record(&mut self, time: f64, body: usize, position: [f64; 3]) -> Result<()> {
        (**self).record(time, body, position)
    }

    #[inline]
    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

/// [`TrajectorySink`] writing `time,bodyId,xPosition,yPosition,zPosition` rows.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvSink<W> {
    /// Creates a new [`CsvSink`] writing to `writer`. The header is written with the first row.
    #[inline]
    pub fn new(writer: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(writer),
        }
    }

    /// Flushes and returns the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))
    }
}

impl CsvSink<File> {
    /// Creates a [`CsvSink`] writing to a new file at `path`.
    #[inline]
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            writer: csv::Writer::from_path(path)?,
        })
    }
}

impl<W: Write> TrajectorySink for CsvSink<W> {
    #[inline]
    fn record(&mut self, time: f64, body: usize, [x, y, z]: [f64; 3]) -> Result<()> {
        self.writer.serialize(TrajectoryRow {
            time,
            body_id: body,
            x,
            y,
            z,
        })?;
        Ok(())
    }

    #[inline]
    fn flush(&mut self) -> Result<()> {
        Ok(self.writer.flush()?)
    }
}

/// Returns the positions relative to body `reference_frame`, or unchanged if `None`.
pub fn relative_positions(
    positions: &[Double4],
    reference_frame: Option<usize>,
) -> Result<Vec<[f64; 3]>> {
    let origin = match reference_frame {
        Some(reference) => *positions.get(reference).ok_or_else(|| {
            Error::Config(format!(
                "reference frame {reference} out of range for {} bodies",
                positions.len()
            ))
        })?,
        None => Double4::ZERO,
    };

    Ok(positions.iter().map(|&p| (p - origin).to_array()).collect())
}
