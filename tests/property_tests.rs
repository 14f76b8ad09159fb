//! Property tests for the embed/extract codec.

use proptest::prelude::*;

use steggo::bits;
use steggo::carrier::{IndexedFrame, IndexedFrames};
use steggo::header::{self, HeaderScanner};
use steggo::stego::{self, EmbedOptions};
use steggo::{Carrier, CodecLimits, PixelGrid, StegoError, TransformId};

const TEXT_SAFE: [TransformId; 5] = [
    TransformId::Rot13,
    TransformId::Base16,
    TransformId::Base32,
    TransformId::Base64,
    TransformId::Base85,
];

fn pixel_carrier(pixels: usize, seed: u8) -> Carrier {
    let data = (0..pixels * 3).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect();
    PixelGrid::new(pixels as u32, 1, 3, data).unwrap().into()
}

fn framed_len(payload: &[u8], opts: &EmbedOptions) -> usize {
    stego::frame(payload, opts).unwrap().bytes.len()
}

proptest! {
    #[test]
    fn split_reassemble_identity(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        prop_assert_eq!(bits::reassemble(&bits::split(&bytes)).unwrap(), bytes);
    }

    #[test]
    fn pixel_roundtrip(
        payload in prop::collection::vec(any::<u8>(), 0..300),
        ops in prop::sample::subsequence(TEXT_SAFE.to_vec(), 0..=3),
        spare in 1usize..64,
        seed in any::<u8>(),
    ) {
        let opts = EmbedOptions { pre_encoding: ops.clone(), ..EmbedOptions::default() };
        let mut carrier = pixel_carrier(framed_len(&payload, &opts) + spare, seed);
        stego::embed(&mut carrier, &payload, &opts).unwrap();

        let out = stego::extract(&carrier, &opts.limits).unwrap();
        prop_assert_eq!(out.payload, payload);
        prop_assert_eq!(out.header.pre_encoding, ops);
        prop_assert_eq!(out.header.source_type, "txt");
    }

    #[test]
    fn capacity_boundary_is_strict(payload in prop::collection::vec(any::<u8>(), 0..200)) {
        let opts = EmbedOptions::default();
        let n = framed_len(&payload, &opts);

        let mut exact = pixel_carrier(n, 7);
        let before = exact.clone();
        match stego::embed(&mut exact, &payload, &opts) {
            Err(StegoError::PayloadTooLarge { required, available }) => {
                prop_assert_eq!(required, n * 3);
                prop_assert_eq!(available, n * 3);
            }
            other => prop_assert!(false, "expected PayloadTooLarge, got {:?}", other),
        }
        prop_assert_eq!(exact, before);

        let mut roomy = pixel_carrier(n + 1, 7);
        prop_assert!(stego::embed(&mut roomy, &payload, &opts).is_ok());
    }

    #[test]
    fn scanner_ignores_trailing_bytes(
        size in 0usize..1_000_000,
        ext in "[a-z0-9]{0,6}",
        ops in prop::sample::subsequence(TEXT_SAFE.to_vec(), 0..=5),
        trailing in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let encoded = header::encode(size, &ext, &ops).unwrap();
        let mut stream = encoded.clone();
        stream.extend_from_slice(&trailing);

        let mut scanner = HeaderScanner::new(CodecLimits::default().max_header_len);
        let mut done_at = None;
        for (i, &b) in stream.iter().enumerate() {
            if scanner.push(b).unwrap() {
                done_at = Some(i + 1);
                break;
            }
        }
        prop_assert_eq!(done_at, Some(encoded.len()));
        let h = scanner.into_header().unwrap();
        prop_assert_eq!(h.size, size);
        prop_assert_eq!(h.source_type, ext);
        prop_assert_eq!(h.pre_encoding, ops);
    }

    #[test]
    fn palette_skip_sets_survive_embedding(
        palette in prop::collection::vec(
            prop_oneof![Just([0u8, 0, 0]), any::<[u8; 3]>()],
            256,
        ),
        used in prop::collection::vec(0u8..64, 64),
        payload in prop::collection::vec(any::<u8>(), 0..40),
    ) {
        let limits = CodecLimits::default();
        let frame = IndexedFrame::new(8, 8, used, palette).unwrap();
        let skipped_before: Vec<usize> = {
            let embeddable = frame.embeddable_slots(&limits);
            frame.unused_slots(&limits).into_iter().filter(|s| !embeddable.contains(s)).collect()
        };
        let mut carrier: Carrier = IndexedFrames::new(8, 8, vec![frame]).unwrap().into();

        let opts = EmbedOptions { pre_encoding: vec![TransformId::Base64], ..EmbedOptions::default() };
        let fits = framed_len(&payload, &opts) * 3 < carrier.capacity(&limits).values;
        prop_assume!(fits);

        stego::embed(&mut carrier, &payload, &opts).unwrap();
        let Carrier::Indexed(frames) = &carrier else { unreachable!() };
        let f = &frames.frames[0];
        let embeddable = f.embeddable_slots(&limits);
        let skipped_after: Vec<usize> = f.unused_slots(&limits).into_iter().filter(|s| !embeddable.contains(s)).collect();
        prop_assert_eq!(skipped_before, skipped_after);

        prop_assert_eq!(stego::extract(&carrier, &limits).unwrap().payload, payload);
    }
}
