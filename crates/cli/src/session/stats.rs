//! Streaming session statistics.

use std::time::Duration;

use contracts::ClockOffset;

/// Statistics from a streaming session
#[derive(Debug, Clone, Default)]
pub struct StreamStats {
    /// Samples pushed by the sample source
    pub samples_received: u64,

    /// Samples discarded while the offset was not calibrated
    pub samples_dropped: u64,

    /// Full batches handed to the streamer
    pub batches_emitted: u64,

    /// Batches written to the event connection
    pub batches_sent: u64,

    pub bytes_sent: u64,

    pub play_commands_sent: u64,

    /// Samples left in the buffer at the end
    pub pending_samples: usize,

    /// Offset used for translation
    pub offset: ClockOffset,

    /// Total duration of the session
    pub duration: Duration,
}

impl StreamStats {
    /// Samples per second handed to the streamer
    pub fn sample_rate(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            (self.samples_received - self.samples_dropped) as f64 / secs
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Streaming Statistics                      ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("Clock offset");
        println!("   ├─ deltaT: {:.3} ms", self.offset.delta_t);
        println!("   └─ mse: {:.3} ms", self.offset.mse);

        println!("\nSamples");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Received: {}", self.samples_received);
        println!("   ├─ Dropped (uncalibrated): {}", self.samples_dropped);
        println!("   ├─ Left in buffer: {}", self.pending_samples);
        println!("   └─ Rate: {:.2}/s", self.sample_rate());

        println!("\nEvent stream");
        println!("   ├─ Batches handed off: {}", self.batches_emitted);
        println!("   ├─ Batches sent: {}", self.batches_sent);
        println!("   ├─ Bytes sent: {}", self.bytes_sent);
        println!("   └─ Play commands: {}", self.play_commands_sent);

        println!();
    }
}
