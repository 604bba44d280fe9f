// Telomere framing: escaping, boundary detection, cursor ranges.

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

    use gopar3_core::cancel::CancelToken;
    use gopar3_core::telomeres::{TelomereConfig, TelomereDecoder, TelomereEncoder, TelomereError};
    use proptest::prelude::*;

    fn encode_chunks(chunks: &[&[u8]], config: TelomereConfig) -> Vec<u8> {
        let mut encoder = TelomereEncoder::new(Vec::new(), config).unwrap();
        encoder.cut().unwrap();
        for chunk in chunks {
            encoder.write_all(chunk).unwrap();
            encoder.cut().unwrap();
        }
        encoder.into_inner().unwrap()
    }

    /// Decoded chunks with their raw `[start, end)` ranges.
    fn decode_all(wire: &[u8], config: TelomereConfig) -> Vec<(Vec<u8>, u64, u64)> {
        let mut decoder = TelomereDecoder::new(Cursor::new(wire), config).unwrap();
        let mut out = Vec::new();
        while decoder.seek_chunk().unwrap() {
            let start = decoder.cursor();
            let mut chunk = Vec::new();
            let n = decoder.stream_chunk(&mut chunk).unwrap();
            assert_eq!(n, Some(chunk.len() as u64));
            out.push((chunk, start, decoder.cursor()));
        }
        out
    }

    fn chunks_only(wire: &[u8], config: TelomereConfig) -> Vec<Vec<u8>> {
        decode_all(wire, config).into_iter().map(|(c, _, _)| c).collect()
    }

    #[test]
    fn hello_world_layout_and_roundtrip() {
        let config = TelomereConfig::default();
        let wire = encode_chunks(&[b"hello", b"world"], config);
        assert_eq!(wire, b"::::::::hello::::::::world::::::::".to_vec());
        assert_eq!(chunks_only(&wire, config), vec![b"hello".to_vec(), b"world".to_vec()]);
    }

    #[test]
    fn cursor_reports_exact_chunk_ranges() {
        let config = TelomereConfig::default();
        let wire = b"::::::::hello::::::::world::::::::";
        let decoded = decode_all(wire, config);
        assert_eq!(decoded.len(), 2);
        assert_eq!((decoded[0].1, decoded[0].2), (8, 13));
        assert_eq!((decoded[1].1, decoded[1].2), (21, 26));
        assert_eq!(&wire[8..13], b"hello");
        assert_eq!(&wire[21..26], b"world");
    }

    #[test]
    fn escaped_ranges_cover_raw_bytes() {
        let config = TelomereConfig::default();
        let wire = encode_chunks(&[b"a:b", b"\\"], config);
        let decoded = decode_all(&wire, config);
        assert_eq!(decoded[0].0, b"a:b");
        assert_eq!(&wire[decoded[0].1 as usize..decoded[0].2 as usize], b"a\\:b");
        assert_eq!(decoded[1].0, b"\\");
        assert_eq!(&wire[decoded[1].1 as usize..decoded[1].2 as usize], b"\\\\");
    }

    #[test]
    fn runs_of_marks_and_escapes_roundtrip() {
        let config = TelomereConfig::default();
        for n in 1..=136 {
            for byte in [b':', b'\\'] {
                let payload = vec![byte; n];
                let wire = encode_chunks(&[&payload], config);
                assert_eq!(chunks_only(&wire, config), vec![payload.clone()], "byte {byte} x{n}");
            }
        }
    }

    #[test]
    fn short_mark_run_is_data() {
        let config = TelomereConfig::default();
        let mut raw = b"abc".to_vec();
        raw.extend(std::iter::repeat(b':').take(config.minimum - 1));
        raw.extend_from_slice(b"def");

        let chunks = chunks_only(&raw, config);
        assert_eq!(chunks, vec![raw.clone()]);
    }

    #[test]
    fn minimum_mark_run_is_boundary() {
        let config = TelomereConfig::default();
        for extra in 0..4 {
            let mut raw = b"abc".to_vec();
            raw.extend(std::iter::repeat(b':').take(config.minimum + extra));
            raw.extend_from_slice(b"def");
            assert_eq!(chunks_only(&raw, config), vec![b"abc".to_vec(), b"def".to_vec()]);
        }
    }

    #[test]
    fn leading_garbage_becomes_its_own_chunk() {
        let config = TelomereConfig::default();
        let mut wire = b"junk".to_vec();
        wire.extend(encode_chunks(&[b"hello"], config));
        assert_eq!(chunks_only(&wire, config), vec![b"junk".to_vec(), b"hello".to_vec()]);
    }

    #[test]
    fn trailing_partial_boundary_is_not_data() {
        let config = TelomereConfig::default();
        let decoded = decode_all(b"::::::::hello:::", config);
        assert_eq!(decoded, vec![(b"hello".to_vec(), 8, 13)]);
    }

    #[test]
    fn unpaired_escape_at_end_is_an_error() {
        let config = TelomereConfig::default();
        let mut decoder = TelomereDecoder::new(Cursor::new(b"::::::::abc\\".to_vec()), config).unwrap();
        let mut sink = Vec::new();
        match decoder.stream_chunk(&mut sink) {
            Err(TelomereError::UnpairedEscape(at)) => assert_eq!(at, 11),
            other => panic!("expected unpaired escape, got {:?}", other),
        }
    }

    #[test]
    fn empty_input_yields_no_chunk() {
        let config = TelomereConfig::default();
        let mut decoder = TelomereDecoder::new(Cursor::new(Vec::<u8>::new()), config).unwrap();
        let mut sink = Vec::new();
        assert_eq!(decoder.stream_chunk(&mut sink).unwrap(), None);

        let mut decoder = TelomereDecoder::new(Cursor::new(b"::::::::::::".to_vec()), config).unwrap();
        assert_eq!(decoder.stream_chunk(&mut sink).unwrap(), None);
        assert!(sink.is_empty());
    }

    #[test]
    fn seek_to_rereads_a_recorded_range() {
        let config = TelomereConfig::default();
        let wire = encode_chunks(&[b"first", b"sec:ond", b"third"], config);
        let ranges = decode_all(&wire, config);

        let mut decoder = TelomereDecoder::new(Cursor::new(wire.clone()), config).unwrap();
        decoder.seek_to(ranges[1].1).unwrap();
        let mut chunk = Vec::new();
        decoder.stream_chunk(&mut chunk).unwrap();
        assert_eq!(chunk, b"sec:ond");
        assert_eq!(decoder.cursor(), ranges[1].2);
    }

    #[test]
    fn custom_mark_and_minimum() {
        let config = TelomereConfig {
            mark: b'#',
            escape: b'!',
            minimum: 3,
            buffer_size: 4,
        };
        let wire = encode_chunks(&[b"a#b!c", b"###"], config);
        assert!(wire.starts_with(b"###a!#b!!c###"));
        assert_eq!(chunks_only(&wire, config), vec![b"a#b!c".to_vec(), b"###".to_vec()]);
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let zero = TelomereConfig { minimum: 0, ..TelomereConfig::default() };
        assert!(matches!(zero.validate(), Err(TelomereError::ZeroMinimum)));

        let same = TelomereConfig { escape: b':', ..TelomereConfig::default() };
        assert!(matches!(same.validate(), Err(TelomereError::MarkIsEscape(b':'))));

        let tiny = TelomereConfig { buffer_size: 2, ..TelomereConfig::default() };
        assert!(matches!(tiny.validate(), Err(TelomereError::BufferTooSmall(2))));
        assert!(TelomereEncoder::new(Vec::new(), tiny).is_err());
    }

    /// Fires `cancel` as soon as the first buffer has been read.
    struct CancelAfterFirstRead {
        inner: Cursor<Vec<u8>>,
        cancel: CancelToken,
    }

    impl Read for CancelAfterFirstRead {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.inner.read(buf)?;
            self.cancel.cancel();
            Ok(n)
        }
    }

    impl Seek for CancelAfterFirstRead {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    #[test]
    fn cancellation_stops_a_long_chunk() {
        let config = TelomereConfig { buffer_size: 4096, ..TelomereConfig::default() };
        let body = vec![b'x'; 1 << 20];
        let wire = encode_chunks(&[&body], config);

        let cancel = CancelToken::new();
        let reader = CancelAfterFirstRead { inner: Cursor::new(wire), cancel: cancel.clone() };
        let mut decoder = TelomereDecoder::new(reader, config).unwrap().with_cancel(cancel);
        assert!(decoder.seek_chunk().unwrap());

        let mut chunk = Vec::new();
        let result = decoder.stream_chunk(&mut chunk);
        assert!(matches!(result, Err(TelomereError::Cancelled)));
        assert!(chunk.len() < body.len());
        assert!(decoder.cursor() <= 4096);
    }

    #[test]
    fn decoder_without_token_ignores_cancellation() {
        let config = TelomereConfig::default();
        let wire = encode_chunks(&[b"still decoded"], config);
        let reader = CancelAfterFirstRead { inner: Cursor::new(wire), cancel: CancelToken::new() };
        let mut decoder = TelomereDecoder::new(reader, config).unwrap();
        assert!(decoder.seek_chunk().unwrap());
        let mut chunk = Vec::new();
        assert_eq!(decoder.stream_chunk(&mut chunk).unwrap(), Some(13));
        assert_eq!(chunk, b"still decoded");
    }

    proptest! {
        #[test]
        fn prop_chunks_roundtrip(
            chunks in prop::collection::vec(
                prop::collection::vec(prop_oneof![Just(b':'), Just(b'\\'), any::<u8>()], 1..200),
                1..8,
            ),
            buffer_size in 4usize..64,
            minimum in 1usize..12,
        ) {
            let config = TelomereConfig { buffer_size, minimum, ..TelomereConfig::default() };
            let refs: Vec<&[u8]> = chunks.iter().map(|c| c.as_slice()).collect();
            let wire = encode_chunks(&refs, config);
            prop_assert_eq!(chunks_only(&wire, config), chunks);
        }
    }
}
