#[cfg(test)]
mod telemetry_tests {
    use std::io::Cursor;
    use std::time::Duration;

    use gopar3_core::stream::{encode, EncodeParams, PipelineConfig};
    use gopar3_core::telemetry::{Stage, StageTimes, TelemetryCounters, TelemetrySnapshot, TelemetryTimer};

    fn make_timer() -> TelemetryTimer {
        let mut timer = TelemetryTimer::new();
        std::thread::sleep(Duration::from_millis(10));
        timer.add_stage_time(Stage::Read, Duration::from_millis(3));
        timer.add_stage_time(Stage::Parity, Duration::from_millis(2));
        timer.add_stage_time(Stage::Read, Duration::from_millis(1));
        timer.finish();
        timer
    }

    #[test]
    fn stage_times_accumulate_and_merge() {
        let timer = make_timer();
        assert_eq!(timer.stage_times.get(Stage::Read), Duration::from_millis(4));
        assert_eq!(timer.stage_times.get(Stage::Verify), Duration::ZERO);
        assert_eq!(timer.stage_times.total(), Duration::from_millis(6));

        let mut other = StageTimes::default();
        other.add(Stage::Parity, Duration::from_millis(5));
        let mut merged = timer.stage_times.clone();
        merged.merge(&other);
        assert_eq!(merged.get(Stage::Parity), Duration::from_millis(7));
        assert!((merged.get_ms(Stage::Parity) - 7.0).abs() < 1e-9);
        assert_eq!(Stage::Reconstruct.to_string(), "reconstruct");
    }

    #[test]
    fn counters_merge() {
        let mut a = TelemetryCounters::default();
        a.add_batch(100, 28);
        a.add_shard_written(64, 84);
        let mut b = TelemetryCounters::default();
        b.add_loaded(6, 2);
        b.add_reconstructed(2);
        b.add_restored(100);

        a += b;
        assert_eq!(a.batches, 1);
        assert_eq!(a.bytes_source, 100);
        assert_eq!(a.bytes_padding, 28);
        assert_eq!(a.shards_written, 1);
        assert_eq!(a.bytes_payload, 64);
        assert_eq!(a.bytes_written, 184);
        assert_eq!((a.shards_loaded, a.shards_missing, a.shards_reconstructed), (6, 2, 2));
    }

    #[test]
    fn snapshot_ratios() {
        let mut counters = TelemetryCounters::default();
        counters.add_batch(96, 0);
        for _ in 0..5 {
            counters.add_shard_written(32, 52);
        }
        let snapshot = TelemetrySnapshot::from(&counters, &make_timer());

        assert!((snapshot.expansion_ratio - 160.0 / 96.0).abs() < 1e-9);
        assert!(snapshot.throughput_bytes_per_sec > 0.0);
        assert!(snapshot.elapsed >= snapshot.total_stage_time());
        assert_eq!(snapshot.output_bytes(), 260);

        let empty = TelemetrySnapshot::from(&TelemetryCounters::default(), &make_timer());
        assert_eq!(empty.expansion_ratio, 0.0);
    }

    #[test]
    fn encode_reports_shards_and_padding() {
        let params = EncodeParams::new(4, 2, 16);
        let data = vec![0xabu8; 150];
        let mut wire = Vec::new();
        let snapshot = encode(Cursor::new(&data), &mut wire, &params, &PipelineConfig::default()).unwrap();

        // 150 bytes over 64-byte batches.
        assert_eq!(snapshot.counters.batches, 3);
        assert_eq!(snapshot.counters.shards_written, 18);
        assert_eq!(snapshot.counters.bytes_source, 150);
        assert_eq!(snapshot.counters.bytes_padding, 3 * 64 - 150);
        assert_eq!(snapshot.counters.bytes_payload, 18 * 16);
        assert_eq!(snapshot.counters.bytes_written, 18 * (20 + 16));
        assert!((snapshot.expansion_ratio - 288.0 / 150.0).abs() < 1e-9);

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: TelemetrySnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.counters, snapshot.counters);
    }
}
