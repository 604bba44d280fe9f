// End-to-end: encode → scan → index → restore.

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use gopar3_core::prelude::*;
    use rand::{rngs::StdRng, RngCore, SeedableRng};

    const QUORUM: u8 = 5;
    const REDUNDANCY: u8 = 3;
    const SHARD_SIZE: usize = 64;

    fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
        let mut data = vec![0u8; len];
        StdRng::seed_from_u64(seed).fill_bytes(&mut data);
        data
    }

    fn params() -> EncodeParams {
        EncodeParams::new(QUORUM, REDUNDANCY, SHARD_SIZE)
    }

    fn encoded(data: &[u8], params: &EncodeParams) -> Vec<u8> {
        let mut wire = Vec::new();
        encode(Cursor::new(data), &mut wire, params, &PipelineConfig::default()).unwrap();
        wire
    }

    fn scan(opener: &MemoryOpener) -> Index {
        scan_sources(opener, &opener.ids(), &ScanOptions::default(), &PipelineConfig::default()).unwrap()
    }

    fn single_file(index: &Index) -> File {
        let mut files = index.recoverable();
        let (_, file) = files.next().expect("one recoverable file");
        assert!(files.next().is_none());
        file.clone()
    }

    fn restored(opener: &MemoryOpener, file: &File) -> Result<Vec<u8>, StreamError> {
        let mut out = Vec::new();
        restore_with(opener, &mut out, file, &RestoreOptions::default(), &PipelineConfig::default())?;
        Ok(out)
    }

    /// Flip the last raw byte of each shard without creating a boundary.
    fn damage(wire: &mut [u8], shards: &[&Shard]) {
        for shard in shards {
            let at = (shard.last_byte - 1) as usize;
            wire[at] = if wire[at] == b'A' { b'B' } else { b'A' };
        }
    }

    #[test]
    fn roundtrip_through_memory() {
        let data = random_bytes(SHARD_SIZE * QUORUM as usize * 3 + 17, 1);
        let mut opener = MemoryOpener::new();
        opener.insert("wire", encoded(&data, &params()));

        let index = scan(&opener);
        let file = single_file(&index);
        assert_eq!(file.batches, 4);
        assert_eq!(file.parity, REDUNDANCY);
        assert_eq!(restored(&opener, &file).unwrap(), data);
    }

    #[test]
    fn survives_loss_up_to_redundancy() {
        let data = random_bytes(1000, 2);
        let wire = encoded(&data, &params());
        let mut opener = MemoryOpener::new();
        opener.insert("wire", wire.clone());
        let file = single_file(&scan(&opener));

        // Three data shards of batch 1 go bad on disk after indexing.
        let victims: Vec<&Shard> = file
            .shards
            .iter()
            .filter(|s| s.tag.shard_batch == 1 && [0, 2, 4].contains(&s.tag.shard_order))
            .collect();
        assert_eq!(victims.len(), 3);
        let mut broken = wire.clone();
        damage(&mut broken, &victims);
        opener.insert("wire", broken);

        let mut out = Vec::new();
        let snapshot = restore_with(&opener, &mut out, &file, &RestoreOptions::default(), &PipelineConfig::default()).unwrap();
        assert_eq!(out, data);
        assert_eq!(snapshot.counters.shards_reconstructed, 3);
        assert_eq!(snapshot.counters.shards_missing, 3);
        assert_eq!(snapshot.counters.bytes_written, 1000);
    }

    #[test]
    fn loss_beyond_redundancy_fails_explicitly() {
        let data = random_bytes(1000, 3);
        let wire = encoded(&data, &params());
        let mut opener = MemoryOpener::new();
        opener.insert("wire", wire.clone());
        let file = single_file(&scan(&opener));

        let victims: Vec<&Shard> = file
            .shards
            .iter()
            .filter(|s| s.tag.shard_batch == 1 && s.tag.shard_order < 4)
            .collect();
        let mut broken = wire.clone();
        damage(&mut broken, &victims);
        opener.insert("wire", broken);

        match restored(&opener, &file) {
            Err(StreamError::InsufficientShards { batch, available, required }) => {
                assert_eq!((batch, available, required), (1, 4, 5));
            }
            other => panic!("expected insufficient shards, got {:?}", other.map(|v| v.len())),
        }
    }

    #[test]
    fn unrecoverable_index_entry_is_refused() {
        let data = random_bytes(700, 4);
        let mut opener = MemoryOpener::new();
        opener.insert("wire", encoded(&data, &params()));
        let index = scan(&opener);
        let (_, full) = index.files().next().unwrap();

        let mut file = File {
            shards: full
                .shards
                .iter()
                .filter(|s| !(s.tag.shard_batch == 0 && s.tag.shard_order < 4))
                .cloned()
                .collect(),
            ..File::default()
        };
        file.normalize();
        assert_eq!(
            file.error.as_deref(),
            Some("batch 0 has only 4 usable shards out of 5 required")
        );
        assert!(matches!(restored(&opener, &file), Err(StreamError::FileUnrecoverable(_))));
    }

    /// Round-trip `file` through JSON with one field overwritten.
    fn tampered(file: &File, field: &str, value: serde_json::Value) -> File {
        let mut json = serde_json::to_value(file).unwrap();
        json[field] = value;
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn tampered_index_entry_is_refused() {
        let data = random_bytes(977, 12);
        let mut opener = MemoryOpener::new();
        opener.insert("wire", encoded(&data, &params()));
        let file = single_file(&scan(&opener));
        assert_eq!(file.batches, 4);
        assert!(file.validate().is_ok());

        for (field, value) in [
            ("batches", serde_json::json!(35_184_372_088_832u64)),
            ("batches", serde_json::json!(3)),
            ("parity", serde_json::json!(255)),
            ("quorum", serde_json::json!(0)),
            ("shard_size", serde_json::json!(0)),
            ("shard_size", serde_json::json!(u64::MAX)),
        ] {
            let bad = tampered(&file, field, value);
            assert!(matches!(bad.validate(), Err(StreamError::FileUnrecoverable(_))), "{field}");
            assert!(matches!(restored(&opener, &bad), Err(StreamError::FileUnrecoverable(_))), "{field}");
        }

        let empty = File { shards: Vec::new(), ..file.clone() };
        assert!(matches!(restored(&opener, &empty), Err(StreamError::FileUnrecoverable(_))));
        assert_eq!(restored(&opener, &file).unwrap(), data);
    }

    #[test]
    fn wrong_whole_file_checksum_is_detected() {
        let data = random_bytes(500, 5);
        let mut opener = MemoryOpener::new();
        opener.insert("wire", encoded(&data, &params()));
        let mut file = single_file(&scan(&opener));
        file.checksum ^= 1;

        assert!(matches!(
            restored(&opener, &file),
            Err(StreamError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn empty_source_roundtrips() {
        let mut opener = MemoryOpener::new();
        opener.insert("wire", encoded(&[], &params()));

        let file = single_file(&scan(&opener));
        assert_eq!(file.size, 0);
        assert_eq!(file.batches, 1);
        assert_eq!(file.padding, SHARD_SIZE as u64 * QUORUM as u64);
        assert!(restored(&opener, &file).unwrap().is_empty());
    }

    #[test]
    fn garbage_around_and_inside_the_stream() {
        let data = random_bytes(900, 6);
        let wire = encoded(&data, &params());
        let mut dirty = b"leading noise".to_vec();
        dirty.extend_from_slice(&wire[..wire.len() / 2]);
        dirty.extend_from_slice(b"::::::::junk in the middle::::::::");
        dirty.extend_from_slice(&wire[wire.len() / 2..]);
        dirty.extend_from_slice(b"trailing");

        let mut opener = MemoryOpener::new();
        opener.insert("dirty", dirty);
        let index = scan(&opener);
        let file = single_file(&index);
        assert_eq!(restored(&opener, &file).unwrap(), data);
    }

    #[test]
    fn concatenated_runs_restore_independently() {
        let first = random_bytes(400, 7);
        let second = random_bytes(333, 8);
        let mut wire = encoded(&first, &params());
        wire.extend(encoded(&second, &EncodeParams::new(3, 2, 32)));

        let mut opener = MemoryOpener::new();
        opener.insert("both", wire);
        let index = scan(&opener);
        assert_eq!(index.recoverable().count(), 2);

        let mut outputs: Vec<Vec<u8>> = index.recoverable().map(|(_, f)| restored(&opener, f).unwrap()).collect();
        outputs.sort_by_key(|o| o.len());
        assert_eq!(outputs, vec![second, first]);
    }

    #[test]
    fn scattered_encode_loses_whole_destinations() {
        let data = random_bytes(2000, 9);
        let p = params();
        let mut outputs: Vec<Vec<u8>> = vec![Vec::new(); p.total_shards()];
        let destinations: Vec<&mut Vec<u8>> = outputs.iter_mut().collect();
        let snapshot = encode_scattered(Cursor::new(&data), destinations, &p, &PipelineConfig::default()).unwrap();
        assert_eq!(snapshot.counters.shards_written, 7 * 8);

        // Keep five of the eight streams: two data, three parity.
        let mut opener = MemoryOpener::new();
        for (order, bytes) in outputs.into_iter().enumerate() {
            if [1, 3, 4].contains(&order) {
                continue;
            }
            opener.insert(format!("part-{order}"), bytes);
        }

        let file = single_file(&scan(&opener));
        assert_eq!(file.parity, REDUNDANCY);
        assert_eq!(restored(&opener, &file).unwrap(), data);
    }

    #[test]
    fn scattered_encode_needs_one_destination_per_order() {
        let mut outputs: Vec<Vec<u8>> = vec![Vec::new(); 3];
        let destinations: Vec<&mut Vec<u8>> = outputs.iter_mut().collect();
        let result = encode_scattered(Cursor::new(b"x"), destinations, &params(), &PipelineConfig::default());
        assert!(matches!(result, Err(StreamError::Validation(_))));
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let mut sink = Vec::new();
        for p in [
            EncodeParams::new(0, 1, 8),
            EncodeParams::new(4, 0, 8),
            EncodeParams::new(200, 57, 8),
            EncodeParams::new(4, 2, 0),
        ] {
            let result = encode(Cursor::new(b"data"), &mut sink, &p, &PipelineConfig::default());
            assert!(matches!(result, Err(StreamError::Validation(_))), "{:?}", p);
        }
        assert!(sink.is_empty());
    }

    #[test]
    fn cancelled_encode_stops() {
        let config = PipelineConfig::default();
        config.cancel.cancel();
        let mut sink = Vec::new();
        let result = encode(Cursor::new(random_bytes(4096, 10)), &mut sink, &params(), &config);
        assert!(matches!(result, Err(StreamError::Cancelled)));
    }

    #[test]
    fn cancelled_restore_stops() {
        let data = random_bytes(3000, 11);
        let mut opener = MemoryOpener::new();
        opener.insert("wire", encoded(&data, &params()));
        let file = single_file(&scan(&opener));

        let config = PipelineConfig::default();
        config.cancel.cancel();
        let mut out = Vec::new();
        let result = restore_with(&opener, &mut out, &file, &RestoreOptions::default(), &config);
        assert!(matches!(result, Err(StreamError::Cancelled)));
    }

    #[test]
    fn single_threaded_profile_matches_default() {
        let data = random_bytes(1500, 12);
        let config = PipelineConfig::new(ParallelismProfile::single_threaded(), CancelToken::new());

        let mut wire = Vec::new();
        encode(Cursor::new(&data), &mut wire, &params(), &config).unwrap();
        assert_eq!(wire, encoded(&data, &params()));

        let mut opener = MemoryOpener::new();
        opener.insert("wire", wire);
        let index = scan_sources(&opener, &opener.ids(), &ScanOptions::default(), &config).unwrap();
        let file = single_file(&index);
        let mut out = Vec::new();
        restore_with(&opener, &mut out, &file, &RestoreOptions::default(), &config).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn seeded_checksum_roundtrip() {
        let checksum = Checksum::new(ChecksumAlg::Crc32, 0x1234_5678);
        let p = EncodeParams { checksum, ..params() };
        let data = random_bytes(800, 13);

        let mut opener = MemoryOpener::new();
        opener.insert("wire", encoded(&data, &p));
        let options = ScanOptions { checksum, ..ScanOptions::default() };
        let index = scan_sources(&opener, &opener.ids(), &options, &PipelineConfig::default()).unwrap();
        let file = single_file(&index);

        let (crc, size) = source_checksum(&mut Cursor::new(&data), &checksum, &CancelToken::new()).unwrap();
        assert_eq!((file.checksum, file.size), (crc, size));

        let mut out = Vec::new();
        let restore_options = RestoreOptions { checksum, ..RestoreOptions::default() };
        restore_with(&opener, &mut out, &file, &restore_options, &PipelineConfig::default()).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn files_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let data = random_bytes(5000, 14);

        let shards_path = dir.path().join("data.gp3");
        let shards_file = std::fs::File::create(&shards_path).unwrap();
        encode(Cursor::new(&data), shards_file, &params(), &PipelineConfig::default()).unwrap();

        let index = scan_files(&[&shards_path], &ScanOptions::default(), &PipelineConfig::default()).unwrap();
        let file = single_file(&index);
        assert!(file.shards.iter().all(|s| s.source == shards_path.to_string_lossy()));

        let restored_path = dir.path().join("restored.bin");
        let out = std::fs::File::create(&restored_path).unwrap();
        restore(out, &file, &RestoreOptions::default(), &PipelineConfig::default()).unwrap();
        assert_eq!(std::fs::read(&restored_path).unwrap(), data);
    }

    #[test]
    fn missing_shard_file_is_an_io_error() {
        let index = scan_files(
            &["/nonexistent/gopar3/shards.bin"],
            &ScanOptions::default(),
            &PipelineConfig::default(),
        );
        assert!(matches!(index, Err(StreamError::Io(_))));
    }
}
