//! Length-limited canonical Huffman code construction and decoding.
//!
//! Ported from the weighted-merge algorithm in the reference C
//! implementation's `huffman.c`/`zheap.c`: repeatedly combine the two
//! lightest nodes from a min-heap until one tree remains, read code lengths
//! as leaf depths, then truncate any code longer than the length limit by
//! flattening the offending subtree into a balanced one.

mod heap;

use crate::error::Error;
use heap::Heap;

/// A node in the weighted merge tree / canonical decode tree. Leaves carry a
/// `symbol`; internal nodes have both children set.
pub(crate) struct Node {
    left: Option<Box<Node>>,
    right: Option<Box<Node>>,
    symbol: u32,
    weight: u64,
    height: u32,
}

impl Node {
    fn leaf(symbol: u32, weight: u64) -> Self {
        Self { left: None, right: None, symbol, weight, height: 0 }
    }

    fn internal(left: Node, right: Node, weight: u64, height: u32) -> Self {
        Self { left: Some(Box::new(left)), right: Some(Box::new(right)), symbol: 0, weight, height }
    }

    fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// `(symbol, code_length, code)` — one canonical-code row.
#[derive(Clone, Copy, Debug)]
pub(crate) struct CodeTuple {
    pub symbol: u32,
    pub length: u32,
    pub code: u32,
}

/// Compute length-limited (`<= max_len`) code lengths minimizing total
/// weighted length, one entry per index of `weights`. A weight of 0 means
/// "symbol unused" and gets code length 0. `max_len == 0` means unlimited.
pub(crate) fn code_lengths(weights: &[u64], max_len: u32) -> Vec<u32> {
    let n = weights.len();
    let mut lengths = vec![0u32; n];

    let mut heap = Heap::new();
    for (symbol, &w) in weights.iter().enumerate() {
        if w != 0 {
            heap.push(Node::leaf(symbol as u32, w), w);
        }
    }

    if heap.is_empty() {
        log::warn!("huffman: all weights are zero, no codes assigned");
        return lengths;
    }

    if heap.len() == 1 {
        let node = heap.pop().unwrap();
        lengths[node.symbol as usize] = 1;
        return lengths;
    }

    while heap.len() > 1 {
        let first = heap.pop().unwrap();
        let second = heap.pop().unwrap();
        let (longer, shorter) = if first.height > second.height { (first, second) } else { (second, first) };
        let weight = shorter.weight + longer.weight;
        let height = 1 + shorter.height.max(longer.height);
        heap.push(Node::internal(shorter, longer, weight, height), weight);
    }

    let root = heap.pop().unwrap();
    let height = root.height;
    assign_depths(&root, 0, &mut lengths);

    if max_len != 0 && height > max_len {
        let table = canonical_table(&lengths);
        let mut canon_root = build_decoder_tree(&table);
        flatten_to_fit(&mut canon_root, max_len);
        lengths = vec![0u32; n];
        assign_depths(&canon_root, 0, &mut lengths);
    }

    lengths
}

fn assign_depths(node: &Node, depth: u32, lengths: &mut [u32]) {
    if node.is_leaf() {
        lengths[node.symbol as usize] = depth;
        return;
    }
    if let Some(l) = &node.left {
        assign_depths(l, depth + 1, lengths);
    }
    if let Some(r) = &node.right {
        assign_depths(r, depth + 1, lengths);
    }
}

fn count_leaves(node: Option<&Node>) -> usize {
    match node {
        None => 0,
        Some(n) if n.is_leaf() => 1,
        Some(n) => count_leaves(n.left.as_deref()) + count_leaves(n.right.as_deref()),
    }
}

fn floor_log2(mut x: usize) -> u32 {
    let mut res: i32 = -1;
    while x != 0 {
        x >>= 1;
        res += 1;
    }
    res as u32
}

/// Walk down the right spine, one level per decrement of the remaining
/// length budget, until the right subtree would overflow it; flatten the
/// subtree rooted there into a balanced tree.
fn flatten_to_fit(root: &mut Box<Node>, max_len: u32) {
    let mut remaining = max_len;
    let mut cursor = root;
    loop {
        let leaves_right = count_leaves(cursor.right.as_deref());
        if leaves_right > (1usize << (remaining - 1)) {
            flatten(cursor);
            return;
        }
        remaining -= 1;
        cursor = cursor.right.as_mut().expect("internal node missing right child");
    }
}

fn flatten(node: &mut Box<Node>) {
    let mut leaves = Vec::new();
    collect_leaves_inorder(node, &mut leaves);
    let n = leaves.len();
    *node = construct_flattened(&leaves, 0, n);
}

fn collect_leaves_inorder(node: &Node, out: &mut Vec<u32>) {
    if let Some(l) = &node.left {
        collect_leaves_inorder(l, out);
    }
    if node.is_leaf() {
        out.push(node.symbol);
        return;
    }
    if let Some(r) = &node.right {
        collect_leaves_inorder(r, out);
    }
}

/// Rebuild a balanced tree over `leaves[st..end]`, placing the larger half
/// on the right at each split (so earlier/lower symbols end up shallower).
fn construct_flattened(leaves: &[u32], st: usize, end: usize) -> Box<Node> {
    if end - st <= 1 {
        return Box::new(Node::leaf(leaves[st], 0));
    }
    let diff = end - st - 1;
    let fl = floor_log2(diff);
    let bound = end - (1usize << fl);
    let left = construct_flattened(leaves, st, bound);
    let right = construct_flattened(leaves, bound, end);
    Box::new(Node { left: Some(left), right: Some(right), symbol: 0, weight: 0, height: 0 })
}

/// Assign canonical codes: sort by `(length, symbol)` ascending (ignoring
/// length-0 entries), first code is 0, then
/// `code[i] = (code[i-1] + 1) << (len[i] - len[i-1])`. Returned sorted back
/// by symbol for O(1) lookup.
pub(crate) fn canonical_table(lengths: &[u32]) -> Vec<CodeTuple> {
    let mut table: Vec<CodeTuple> = lengths
        .iter()
        .enumerate()
        .map(|(symbol, &length)| CodeTuple { symbol: symbol as u32, length, code: 0 })
        .collect();

    table.sort_by(|a, b| a.length.cmp(&b.length).then(a.symbol.cmp(&b.symbol)));

    let mut first_set = false;
    for i in 0..table.len() {
        if table[i].length == 0 {
            continue;
        }
        if !first_set {
            first_set = true;
            continue;
        }
        table[i].code = (table[i - 1].code + 1) << (table[i].length - table[i - 1].length);
    }

    table.sort_by_key(|t| t.symbol);
    table
}

/// Build a binary decode tree from a canonical code table: codeword bits
/// walked MSB-first, bit 0 = left, bit 1 = right, leaf at the final bit.
pub(crate) fn build_decoder_tree(table: &[CodeTuple]) -> Box<Node> {
    let mut root = Box::new(Node { left: None, right: None, symbol: 0, weight: 0, height: 0 });

    for t in table {
        if t.length == 0 {
            continue;
        }
        let mut cursor = &mut root;
        for j in (1..t.length).rev() {
            let bit = (t.code >> j) & 1;
            if bit == 0 {
                if cursor.left.is_none() {
                    cursor.left = Some(Box::new(Node { left: None, right: None, symbol: 0, weight: 0, height: 0 }));
                }
                cursor = cursor.left.as_mut().unwrap();
            } else {
                if cursor.right.is_none() {
                    cursor.right = Some(Box::new(Node { left: None, right: None, symbol: 0, weight: 0, height: 0 }));
                }
                cursor = cursor.right.as_mut().unwrap();
            }
        }
        let bit = t.code & 1;
        let leaf = Box::new(Node::leaf(t.symbol, 0));
        if bit == 0 {
            cursor.left = Some(leaf);
        } else {
            cursor.right = Some(leaf);
        }
    }

    root
}

/// Decoder over a [`build_decoder_tree`] result and a source of single bits.
/// `next_bit` must return `None` on end of stream.
pub(crate) fn decode_symbol(
    root: &Node,
    mut next_bit: impl FnMut() -> Option<u32>,
) -> Result<u32, Error> {
    let mut node = root;
    while !node.is_leaf() {
        let bit = next_bit().ok_or(Error::StreamTooShort { needed: 1 })?;
        node = match bit {
            0 => node.left.as_deref().ok_or(Error::CorruptZlibHeader)?,
            _ => node.right.as_deref().ok_or(Error::CorruptZlibHeader)?,
        };
    }
    Ok(node.symbol)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_symbol_gets_length_one() {
        let weights = vec![0u64, 7, 0];
        let lengths = code_lengths(&weights, 15);
        assert_eq!(lengths, vec![0, 1, 0]);
    }

    #[test]
    fn all_zero_weights_yield_no_codes() {
        let lengths = code_lengths(&[0, 0, 0], 15);
        assert_eq!(lengths, vec![0, 0, 0]);
    }

    #[test]
    fn canonical_invariant_holds_and_roundtrips() {
        let weights = vec![5u64, 9, 12, 13, 16, 45];
        let lengths = code_lengths(&weights, 15);
        assert!(lengths.iter().all(|&l| l <= 15));

        let table = canonical_table(&lengths);
        let mut used: Vec<&CodeTuple> = table.iter().filter(|t| t.length > 0).collect();
        used.sort_by(|a, b| a.length.cmp(&b.length).then(a.symbol.cmp(&b.symbol)));
        for w in used.windows(2) {
            let expected = (w[0].code + 1) << (w[1].length - w[0].length);
            assert_eq!(w[1].code, expected);
        }

        // Every codeword decodes back to its originating symbol.
        let tree = build_decoder_tree(&table);
        for t in table.iter().filter(|t| t.length > 0) {
            let mut bits_left = t.length;
            let mut code = t.code;
            let decoded = decode_symbol(&tree, || {
                if bits_left == 0 {
                    return None;
                }
                bits_left -= 1;
                Some((code >> bits_left) & 1)
            })
            .unwrap();
            let _ = &mut code;
            assert_eq!(decoded, t.symbol);
        }
    }

    #[test]
    fn length_limit_is_respected_for_skewed_weights() {
        // Fibonacci-like weights push an unbounded Huffman tree past 15
        // levels; the length limiter must still produce a valid, decodable
        // code no longer than the limit.
        let mut weights = vec![1u64, 1];
        while weights.len() < 40 {
            let n = weights.len();
            weights.push(weights[n - 1] + weights[n - 2]);
        }
        let lengths = code_lengths(&weights, 15);
        assert!(lengths.iter().all(|&l| l <= 15));
        let table = canonical_table(&lengths);
        let tree = build_decoder_tree(&table);
        for t in table.iter().filter(|t| t.length > 0) {
            let mut bits_left = t.length;
            let code = t.code;
            let decoded = decode_symbol(&tree, || {
                if bits_left == 0 {
                    return None;
                }
                bits_left -= 1;
                Some((code >> bits_left) & 1)
            })
            .unwrap();
            assert_eq!(decoded, t.symbol);
        }
    }
}
