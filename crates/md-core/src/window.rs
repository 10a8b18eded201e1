use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};

use crate::config::AnalysisConfig;

/// Rolling `rows × columns` matrix of `f32`, one column per analysed frame.
///
/// Single writer, any number of readers, no locks. Each cell is an
/// `AtomicU32` holding the bits of an `f32` and every access is `Relaxed`:
/// a reader racing the writer can observe a column that is partially
/// updated or one frame stale, never a torn float and never a resized
/// buffer. Consumers only compute whole-window statistics, so this staleness
/// is accepted; blocking here would stall the real-time producer.
///
/// The storage never resizes and starts zero-filled. The write cursor wraps
/// modulo `columns`; the column under the cursor is the oldest one.
struct RollingWindow {
    rows: usize,
    columns: usize,
    /// Row-major cells.
    cells: Box<[AtomicU32]>,
    /// Column the writer will fill next.
    cursor: AtomicUsize,
    /// Total columns written since creation.
    written: AtomicU64,
}

impl RollingWindow {
    fn new(rows: usize, columns: usize) -> Self {
        let cells = (0..rows * columns)
            .map(|_| AtomicU32::new(0.0f32.to_bits()))
            .collect();
        Self {
            rows,
            columns,
            cells,
            cursor: AtomicUsize::new(0),
            written: AtomicU64::new(0),
        }
    }

    #[inline(always)]
    fn load(&self, row: usize, column: usize) -> f32 {
        f32::from_bits(self.cells[row * self.columns + column].load(Ordering::Relaxed))
    }

    #[inline(always)]
    fn store(&self, row: usize, column: usize, value: f32) {
        self.cells[row * self.columns + column].store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Create a rolling window and split it into its unique writer and a reader.
///
/// # Panics
/// Panics if `rows` or `columns` is 0.
///
/// # Example
/// ```
/// use md_core::window::rolling_window;
/// let (mut writer, reader) = rolling_window(2, 4);
/// writer.set(1, 0.5);
/// writer.advance();
/// assert_eq!(reader.get(1, 0), 0.5);
/// assert_eq!(reader.cursor(), 1);
/// ```
#[must_use]
pub fn rolling_window(rows: usize, columns: usize) -> (WindowWriter, WindowReader) {
    assert!(rows > 0 && columns > 0, "rolling window must not be empty");
    let shared = Arc::new(RollingWindow::new(rows, columns));
    (
        WindowWriter {
            shared: Arc::clone(&shared),
            column: 0,
        },
        WindowReader { shared },
    )
}

/// Write handle of a rolling window. Not `Clone`: there is exactly one writer.
pub struct WindowWriter {
    shared: Arc<RollingWindow>,
    column: usize,
}

impl WindowWriter {
    /// Write `value` into `row` of the current column.
    ///
    /// Zero-alloc, wait-free. Safe to call from the audio callback.
    #[inline(always)]
    pub fn set(&mut self, row: usize, value: f32) {
        self.shared.store(row, self.column, value);
    }

    /// Publish the current column and move the cursor to the next one.
    #[inline]
    pub fn advance(&mut self) {
        self.column += 1;
        if self.column == self.shared.columns {
            self.column = 0;
        }
        self.shared.cursor.store(self.column, Ordering::Relaxed);
        self.shared.written.fetch_add(1, Ordering::Relaxed);
    }
}

/// Read handle of a rolling window. Cheap to clone.
#[derive(Clone)]
pub struct WindowReader {
    shared: Arc<RollingWindow>,
}

impl WindowReader {
    /// Number of rows.
    #[inline]
    #[must_use]
    pub fn rows(&self) -> usize {
        self.shared.rows
    }

    /// Number of columns (frames per window).
    #[inline]
    #[must_use]
    pub fn columns(&self) -> usize {
        self.shared.columns
    }

    /// Cell value at (`row`, `column`), storage order.
    #[inline]
    #[must_use]
    pub fn get(&self, row: usize, column: usize) -> f32 {
        self.shared.load(row, column)
    }

    /// Next column the writer will fill, i.e. the oldest column.
    #[inline]
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.shared.cursor.load(Ordering::Relaxed)
    }

    /// Total columns written since creation.
    #[inline]
    #[must_use]
    pub fn frames_written(&self) -> u64 {
        self.shared.written.load(Ordering::Relaxed)
    }

    /// `true` once every column has been written at least once.
    #[inline]
    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.frames_written() >= self.shared.columns as u64
    }

    /// Copy `row` into `out` in storage order.
    ///
    /// `out` must hold `columns()` values; extra slots are left untouched.
    pub fn read_row(&self, row: usize, out: &mut [f32]) {
        for (column, slot) in out.iter_mut().take(self.shared.columns).enumerate() {
            *slot = self.shared.load(row, column);
        }
    }

    /// Copy `row` into `out` oldest column first.
    pub fn read_row_chronological(&self, row: usize, out: &mut [f32]) {
        let columns = self.shared.columns;
        let start = self.cursor();
        for (i, slot) in out.iter_mut().take(columns).enumerate() {
            *slot = self.shared.load(row, (start + i) % columns);
        }
    }

    /// Copy the whole matrix row-major into `out` (`rows × columns` values).
    pub fn read_all(&self, out: &mut [f32]) {
        for (slot, cell) in out.iter_mut().zip(self.shared.cells.iter()) {
            *slot = f32::from_bits(cell.load(Ordering::Relaxed));
        }
    }
}

/// Read side of the two rolling buffers filled by the frame analyzer.
///
/// `timbre` has one row per timbre feature; `flux` has a single row of
/// rectified spectral flux. Both share the same cursor semantics.
#[derive(Clone)]
pub struct SharedWindows {
    /// Timbre matrix (`num_timbre_features × frames_per_window`).
    pub timbre: WindowReader,
    /// Rectified flux buffer (`1 × frames_per_window`).
    pub flux: WindowReader,
}

/// Allocate the timbre matrix and rectified flux buffer for `config`.
///
/// Returns the writers (owned by the producer) and the shared readers.
///
/// # Example
/// ```
/// use md_core::config::AnalysisConfig;
/// use md_core::window::shared_windows;
/// let (_timbre, _flux, windows) = shared_windows(&AnalysisConfig::default());
/// assert_eq!(windows.timbre.rows(), 24);
/// assert_eq!(windows.flux.columns(), 64);
/// ```
#[must_use]
pub fn shared_windows(config: &AnalysisConfig) -> (WindowWriter, WindowWriter, SharedWindows) {
    let columns = config.frames_per_window();
    let (timbre_w, timbre) = rolling_window(config.num_timbre_features(), columns);
    let (flux_w, flux) = rolling_window(1, columns);
    (timbre_w, flux_w, SharedWindows { timbre, flux })
}
