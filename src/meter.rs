//! Sliding-window throughput measurement.
//!
//! The [`ThroughputMeter`] keeps the byte counts of the last
//! [`WINDOW_SLOTS`] intervals of [`SLICE`] each (3 seconds in total) for both
//! directions. Rates are extrapolated from however many slots are held:
//!
//! ```text
//! bytes_per_second = running_total * 10 / slot_count
//! ```
//!
//! Slices are closed lazily: whenever bytes are recorded or a rate is read,
//! every slice boundary that passed since the last update is closed at once.
//! Intervals without I/O become zero slots, so the rate decays towards zero
//! while the connection is idle.
//!
//! The [`Metered`] stream wrapper reports every read and write of the
//! underlying transport to its meter.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Length of one measurement slot.
pub const SLICE: Duration = Duration::from_millis(100);

/// Number of slots kept in the window.
pub const WINDOW_SLOTS: usize = 30;

/// Slots per second, the extrapolation factor.
const SLOTS_PER_SECOND: u64 = 10;

/// Download/upload rate meter over a 3 second window.
///
/// Not thread-safe; it belongs to the single task driving a connection.
#[derive(Debug, Clone)]
pub struct ThroughputMeter {
    /// Closed slots, incoming bytes.
    incoming: VecDeque<u64>,
    /// Closed slots, outgoing bytes.
    outgoing: VecDeque<u64>,
    /// Incoming bytes of the open slice.
    slice_in: u64,
    /// Outgoing bytes of the open slice.
    slice_out: u64,
    /// Sum of `incoming`.
    total_in: u64,
    /// Sum of `outgoing`.
    total_out: u64,
    /// When the open slice closes.
    slice_end: Instant,
}

impl ThroughputMeter {
    /// Create a meter whose first slice starts now.
    pub fn new() -> Self {
        Self::started_at(Instant::now())
    }

    /// Create a meter whose first slice starts at `now`.
    ///
    /// The window starts with one zero slot so the slot count is never zero.
    pub fn started_at(now: Instant) -> Self {
        let mut incoming = VecDeque::with_capacity(WINDOW_SLOTS + 1);
        let mut outgoing = VecDeque::with_capacity(WINDOW_SLOTS + 1);
        incoming.push_back(0);
        outgoing.push_back(0);

        Self {
            incoming,
            outgoing,
            slice_in: 0,
            slice_out: 0,
            total_in: 0,
            total_out: 0,
            slice_end: now + SLICE,
        }
    }

    /// Record bytes received from the transport.
    #[inline]
    pub fn record_read(&mut self, bytes: usize) {
        self.record_at(Instant::now(), bytes, 0);
    }

    /// Record bytes sent to the transport.
    #[inline]
    pub fn record_write(&mut self, bytes: usize) {
        self.record_at(Instant::now(), 0, bytes);
    }

    /// Record traffic at an explicit point in time.
    pub fn record_at(&mut self, now: Instant, received: usize, sent: usize) {
        self.update_slices(now);
        self.slice_in += received as u64;
        self.slice_out += sent as u64;
    }

    /// Incoming bytes per second over the window.
    pub fn download_speed(&mut self) -> u64 {
        self.download_speed_at(Instant::now())
    }

    /// Outgoing bytes per second over the window.
    pub fn upload_speed(&mut self) -> u64 {
        self.upload_speed_at(Instant::now())
    }

    /// Incoming bytes per second, evaluated at `now`.
    pub fn download_speed_at(&mut self, now: Instant) -> u64 {
        self.update_slices(now);
        rate(self.total_in, self.incoming.len())
    }

    /// Outgoing bytes per second, evaluated at `now`.
    pub fn upload_speed_at(&mut self, now: Instant) -> u64 {
        self.update_slices(now);
        rate(self.total_out, self.outgoing.len())
    }

    /// Number of closed slots currently held (1..=30).
    pub fn slot_count(&self) -> usize {
        self.incoming.len()
    }

    /// Close every slice whose boundary lies at or before `now`.
    fn update_slices(&mut self, now: Instant) {
        if now < self.slice_end {
            return;
        }

        let elapsed = now.duration_since(self.slice_end);
        let boundaries = elapsed.as_nanos() / SLICE.as_nanos() + 1;

        if boundaries > WINDOW_SLOTS as u128 {
            // Idle for longer than the window: every held slot is zero.
            self.incoming.clear();
            self.outgoing.clear();
            self.incoming.resize(WINDOW_SLOTS, 0);
            self.outgoing.resize(WINDOW_SLOTS, 0);
            self.slice_in = 0;
            self.slice_out = 0;
            self.total_in = 0;
            self.total_out = 0;
            let skipped = u32::try_from(boundaries).unwrap_or(u32::MAX);
            self.slice_end += SLICE.saturating_mul(skipped);
            return;
        }

        for _ in 0..boundaries {
            self.close_slice();
        }
    }

    fn close_slice(&mut self) {
        self.total_in += self.slice_in;
        self.total_out += self.slice_out;

        if self.incoming.len() == WINDOW_SLOTS {
            self.total_in -= self.incoming.pop_front().unwrap_or(0);
            self.total_out -= self.outgoing.pop_front().unwrap_or(0);
        }

        self.incoming.push_back(self.slice_in);
        self.outgoing.push_back(self.slice_out);

        self.slice_in = 0;
        self.slice_out = 0;
        self.slice_end += SLICE;
    }
}

impl Default for ThroughputMeter {
    fn default() -> Self {
        Self::new()
    }
}

fn rate(total: u64, slots: usize) -> u64 {
    if slots == 0 {
        return 0;
    }
    total * SLOTS_PER_SECOND / slots as u64
}

/// Stream wrapper that reports all traffic to a [`ThroughputMeter`].
#[derive(Debug)]
pub struct Metered<S> {
    inner: S,
    meter: ThroughputMeter,
}

impl<S> Metered<S> {
    /// Wrap a stream; the meter starts now.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            meter: ThroughputMeter::new(),
        }
    }

    /// Get a reference to the underlying stream.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Get a mutable reference to the underlying stream.
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Get the meter.
    pub fn meter_mut(&mut self) -> &mut ThroughputMeter {
        &mut self.meter
    }

    /// Unwrap the stream, dropping the meter.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for Metered<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        ready!(Pin::new(&mut this.inner).poll_read(cx, buf))?;
        this.meter.record_read(buf.filled().len() - before);
        Poll::Ready(Ok(()))
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for Metered<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let written = ready!(Pin::new(&mut this.inner).poll_write(cx, buf))?;
        this.meter.record_write(written);
        Poll::Ready(Ok(written))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_new_meter_reports_zero() {
        let start = Instant::now();
        let mut meter = ThroughputMeter::started_at(start);

        assert_eq!(meter.slot_count(), 1);
        assert_eq!(meter.download_speed_at(start), 0);
        assert_eq!(meter.upload_speed_at(start), 0);
    }

    #[test]
    fn test_open_slice_not_counted_until_closed() {
        let start = Instant::now();
        let mut meter = ThroughputMeter::started_at(start);

        meter.record_at(start + ms(10), 1000, 0);
        assert_eq!(meter.download_speed_at(start + ms(50)), 0);

        // Boundary at 100ms closes the slice: 1000 bytes over 2 slots.
        assert_eq!(meter.download_speed_at(start + ms(100)), 1000 * 10 / 2);
    }

    #[test]
    fn test_directions_are_independent() {
        let start = Instant::now();
        let mut meter = ThroughputMeter::started_at(start);

        meter.record_at(start + ms(10), 500, 20);
        let at = start + ms(150);
        assert_eq!(meter.download_speed_at(at), 500 * 10 / 2);
        assert_eq!(meter.upload_speed_at(at), 20 * 10 / 2);
    }

    #[test]
    fn test_window_caps_at_thirty_slots() {
        let start = Instant::now();
        let mut meter = ThroughputMeter::started_at(start);

        for i in 0..40u64 {
            meter.record_at(start + ms(i * 100 + 10), 100, 0);
        }
        let at = start + ms(4000);
        let speed = meter.download_speed_at(at);

        assert_eq!(meter.slot_count(), WINDOW_SLOTS);
        // Full window of 100-byte slots: 100 bytes per 100ms.
        assert_eq!(speed, 1000);
    }

    #[test]
    fn test_idle_gap_decays_to_zero() {
        let start = Instant::now();
        let mut meter = ThroughputMeter::started_at(start);

        meter.record_at(start + ms(10), 3000, 0);
        assert!(meter.download_speed_at(start + ms(100)) > 0);

        // Well beyond the 3 second window.
        assert_eq!(meter.download_speed_at(start + ms(10_000)), 0);
        assert_eq!(meter.slot_count(), WINDOW_SLOTS);
    }

    #[test]
    fn test_short_idle_gap_dilutes_rate() {
        let start = Instant::now();
        let mut meter = ThroughputMeter::started_at(start);

        meter.record_at(start + ms(10), 900, 0);
        // Eight boundaries pass: initial zero slot + data slot + 7 idle slots.
        let speed = meter.download_speed_at(start + ms(800));
        assert_eq!(meter.slot_count(), 9);
        assert_eq!(speed, 900 * 10 / 9);
    }

    #[test]
    fn test_recording_after_long_idle_starts_fresh_slice() {
        let start = Instant::now();
        let mut meter = ThroughputMeter::started_at(start);

        meter.record_at(start + ms(60_000), 400, 0);
        let speed = meter.download_speed_at(start + ms(60_100));
        assert_eq!(speed, 400 * 10 / WINDOW_SLOTS as u64);
    }

    #[tokio::test]
    async fn test_metered_stream_counts_traffic() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let mock = tokio_test::io::Builder::new()
            .write(b"QUIT\r\n")
            .read(b"205 bye\r\n")
            .build();
        let mut stream = Metered::new(mock);

        stream.write_all(b"QUIT\r\n").await.unwrap();
        let mut buf = [0u8; 32];
        let n = stream.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"205 bye\r\n");

        let later = Instant::now() + Duration::from_secs(1);
        let meter = stream.meter_mut();
        assert!(meter.download_speed_at(later) > 0);
        assert!(meter.upload_speed_at(later) > 0);
    }
}
