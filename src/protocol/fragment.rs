//! Sample fragmentation.
//!
//! A sample larger than one frame is split into the minimum number of
//! `Data` fragments, each carrying at most `max_payload` bytes:
//! ```text
//! 501 bytes, max 245  ->  [0/3: 245] [1/3: 245] [2/3: 11]
//! ```

use bytes::Bytes;

use crate::error::WireError;
use crate::protocol::{DataFragment, MAX_FRAGMENT_PAYLOAD};

/// Splits `sample` into sequenced fragments for `device_id`.
///
/// An empty sample still produces one empty fragment so that the receiver
/// observes a completed transfer.
///
/// # Errors
///
/// Returns `WireError::InvalidPayloadLimit` if `max_payload` is 0 or above
/// `MAX_FRAGMENT_PAYLOAD`, and `WireError::TooManyFragments` if the sample
/// needs more than 255 fragments.
pub fn split_sample(
    device_id: u8,
    sample: &Bytes,
    max_payload: usize,
) -> Result<Vec<DataFragment>, WireError> {
    if max_payload == 0 || max_payload > MAX_FRAGMENT_PAYLOAD {
        return Err(WireError::InvalidPayloadLimit { limit: max_payload });
    }

    let count = sample.len().div_ceil(max_payload).max(1);
    let total = u8::try_from(count).map_err(|_| WireError::TooManyFragments { count })?;

    let mut fragments = Vec::with_capacity(count);
    for index in 0..total {
        let start = usize::from(index) * max_payload;
        let end = (start + max_payload).min(sample.len());
        fragments.push(DataFragment::new(
            device_id,
            index,
            total,
            sample.slice(start..end),
        )?);
    }

    Ok(fragments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_501_bytes() {
        let sample = Bytes::from((0..501).map(|i| (i % 251) as u8).collect::<Vec<_>>());
        let fragments = split_sample(4, &sample, 245).unwrap();

        assert_eq!(fragments.len(), 3);
        let lengths: Vec<_> = fragments.iter().map(|f| f.payload.len()).collect();
        assert_eq!(lengths, [245, 245, 11]);
        for (i, fragment) in fragments.iter().enumerate() {
            assert_eq!(fragment.device_id, 4);
            assert_eq!(usize::from(fragment.fragment_index), i);
            assert_eq!(fragment.total_fragments, 3);
        }
        assert!(fragments[2].is_last());

        let joined: Vec<u8> = fragments.iter().flat_map(|f| f.payload.to_vec()).collect();
        assert_eq!(joined, sample.to_vec());
    }

    #[test]
    fn test_split_exact_multiple() {
        let sample = Bytes::from(vec![1u8; 490]);
        let fragments = split_sample(1, &sample, 245).unwrap();
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[1].payload.len(), 245);
    }

    #[test]
    fn test_split_default_sample_fits_one_fragment() {
        let sample = Bytes::from(vec![0u8; 100]);
        let fragments = split_sample(2, &sample, MAX_FRAGMENT_PAYLOAD).unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].total_fragments, 1);
    }

    #[test]
    fn test_split_empty_sample() {
        let fragments = split_sample(1, &Bytes::new(), 10).unwrap();
        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].payload.is_empty());
    }

    #[test]
    fn test_split_rejects_bad_limits() {
        let sample = Bytes::from_static(b"abc");
        assert_eq!(
            split_sample(1, &sample, 0),
            Err(WireError::InvalidPayloadLimit { limit: 0 })
        );
        assert_eq!(
            split_sample(1, &sample, MAX_FRAGMENT_PAYLOAD + 1),
            Err(WireError::InvalidPayloadLimit {
                limit: MAX_FRAGMENT_PAYLOAD + 1
            })
        );
        let huge = Bytes::from(vec![0u8; 256]);
        assert_eq!(
            split_sample(1, &huge, 1),
            Err(WireError::TooManyFragments { count: 256 })
        );
    }
}
