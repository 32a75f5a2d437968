//! File chunking into CR-LF-aligned shards.
//!
//! Splits the input buffer into `N` disjoint shards, each ending on a CR-LF
//! boundary, without ever parsing a record twice or splitting one across two
//! shards.

/// Returns the byte index immediately after the last CR-LF in `bytes`, `0` if
/// none is present, and `-1` for the empty slice. The `0` return for "not
/// found" is deliberate: a shard with no line boundary at all contributes no
/// records to its worker, and the next worker's start point is left
/// unchanged so it re-covers the same bytes. This is avoided in practice by
/// the `chunk_size` clamp in [`compute_shards`].
pub fn find_last_crlf(bytes: &[u8]) -> isize {
    let len = bytes.len();
    if len == 0 {
        return -1;
    }

    let mut p = len;
    while p > 2 {
        if bytes[p - 2] == 0x0d && bytes[p - 1] == 0x0a {
            return p as isize;
        }
        p -= 1;
    }
    0
}

/// A contiguous, non-overlapping, CR-LF-aligned view into the file buffer.
#[derive(Debug, Clone, Copy)]
pub struct Shard {
    pub index: usize,
    pub start: usize,
    pub end: usize,
}

/// Splits a buffer of length `file_len` into `worker_count` shards, each
/// ending on a CR-LF boundary. `row_byte_length` sets the floor on the
/// nominal chunk size so a chunk is never smaller than one record, which is
/// what keeps `find_last_crlf`'s "not found" case from happening on any shard
/// but possibly the last.
pub fn compute_shards(file_len: usize, worker_count: usize, row_byte_length: usize, bytes: &[u8]) -> Vec<Shard> {
    assert_eq!(bytes.len(), file_len);
    if worker_count == 0 {
        return Vec::new();
    }

    let chunk_size = (file_len / worker_count).max(row_byte_length);

    let mut shards = Vec::with_capacity(worker_count);
    let mut start = 0usize;

    for index in 0..worker_count {
        let tentative_end = if index == worker_count - 1 {
            file_len
        } else {
            ((index + 1) * chunk_size).min(file_len)
        };

        let slice_end = if tentative_end >= file_len {
            file_len
        } else {
            let found = find_last_crlf(&bytes[..tentative_end]);
            if found <= 0 {
                // No CR-LF within the tentative window: fall back to the
                // tentative end itself rather than re-reading `start` forever.
                // This only arises when chunk_size < row_byte_length, which
                // the `.max(row_byte_length)` clamp above rules out in the
                // common case but a pathological file with no CR-LF at all
                // can still trigger it.
                tentative_end
            } else {
                found as usize
            }
        };

        shards.push(Shard {
            index,
            start,
            end: slice_end,
        });
        start = slice_end;

        if start >= file_len {
            // Remaining workers get empty shards rather than panicking on an
            // out-of-range start; this keeps the invariant "no shard starts
            // mid-record" for every constructed shard.
            for trailing in (index + 1)..worker_count {
                shards.push(Shard {
                    index: trailing,
                    start: file_len,
                    end: file_len,
                });
            }
            break;
        }
    }

    shards
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_last_crlf_empty_slice() {
        assert_eq!(find_last_crlf(&[]), -1);
    }

    #[test]
    fn find_last_crlf_none_found() {
        assert_eq!(find_last_crlf(b"abcdef"), 0);
    }

    #[test]
    fn find_last_crlf_finds_trailing_terminator() {
        assert_eq!(find_last_crlf(b"aaaa\r\n"), 6);
    }

    #[test]
    fn find_last_crlf_finds_last_of_several() {
        let buf = b"aaaa\r\nbbbb\r\ncccc";
        assert_eq!(find_last_crlf(buf), 12);
    }

    #[test]
    fn two_workers_split_on_crlf_boundary() {
        let data = b"aaaa\r\nbbbb\r\ncccc\r\ndddd\r\n";
        let shards = compute_shards(data.len(), 2, 6, data);
        assert_eq!(shards.len(), 2);
        assert_eq!(&data[shards[0].start..shards[0].end], b"aaaa\r\nbbbb\r\n");
        assert_eq!(&data[shards[1].start..shards[1].end], b"cccc\r\ndddd\r\n");
    }

    #[test]
    fn shards_cover_the_file_without_overlap() {
        let data = b"aaaa\r\nbbbb\r\ncccc\r\ndddd\r\neeee\r\n";
        for workers in 1..=4 {
            let shards = compute_shards(data.len(), workers, 6, data);
            let mut prev_end = 0usize;
            for shard in &shards {
                assert_eq!(shard.start, prev_end, "shard {} starts mid-record", shard.index);
                prev_end = shard.end;
            }
            assert_eq!(prev_end, data.len());
        }
    }

    #[test]
    fn single_worker_covers_whole_file() {
        let data = b"001hello\r\n002world\r\n";
        let shards = compute_shards(data.len(), 1, 10, data);
        assert_eq!(shards.len(), 1);
        assert_eq!(shards[0].start, 0);
        assert_eq!(shards[0].end, data.len());
    }
}
