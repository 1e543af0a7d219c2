use crate::core::models::alphabet::PLACEHOLDER;

/// All motif-length variants of `peptide` produced by the sliding-window scheme.
///
/// The window has `max(len, motif_length)` start positions. For each start, the
/// `|len - motif_length|` consecutive offsets beginning there (wrapping past the window
/// end back to 0, 1, ...) are either deleted, for longer peptides, or filled with the
/// placeholder, for shorter ones.
pub fn sliding_variants(peptide: &str, motif_length: usize) -> Vec<String> {
    let residues: Vec<char> = peptide.chars().collect();
    let len = residues.len();
    let window = len.max(motif_length);
    let alterations = len.abs_diff(motif_length);

    (0..window)
        .map(|start| {
            let offsets = alteration_offsets(start, alterations, window);
            let mut variant = residues.clone();
            if len > motif_length {
                for (removed, offset) in offsets.into_iter().enumerate() {
                    variant.remove(offset - removed);
                }
            } else {
                for offset in offsets {
                    let at = offset.min(variant.len());
                    variant.insert(at, PLACEHOLDER);
                }
            }
            variant.into_iter().collect()
        })
        .collect()
}

fn alteration_offsets(start: usize, count: usize, window: usize) -> Vec<usize> {
    let mut wrapped = 0;
    let mut offsets: Vec<usize> = (0..count)
        .map(|i| {
            let offset = start + i;
            if offset >= window {
                wrapped += 1;
                wrapped - 1
            } else {
                offset
            }
        })
        .collect();
    offsets.sort_unstable();
    offsets
}
