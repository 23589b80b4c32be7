//! Canonical Huffman tables and DEFLATE symbol decoding (RFC 1951 §3.2).
//!
//! A [`CodeTable`] maps `(bit length, code)` pairs to symbols. Because the
//! codes are canonical, all codes of one length form a contiguous numeric
//! range, so each length is stored as a first code plus the symbols that
//! follow it in order.
//!
//! Every reader in this module runs inside a [`BitCursor`] transaction:
//! either the whole item (symbol, extra bits, table) is read, or nothing is.

use std::sync::LazyLock;

use super::bit_cursor::BitCursor;
use crate::error::{Error, ReadResult, Result};

/// Maximum code length for DEFLATE Huffman codes.
pub const MAX_CODE_LENGTH: u8 = 15;

/// Literal/length symbol that terminates a compressed block.
pub const END_OF_BLOCK: u16 = 256;

/// Largest valid literal/length symbol.
pub const MAX_LENGTH_SYMBOL: u16 = 285;

/// Literal/length alphabet size used for dynamic tables.
pub const LITERAL_LENGTH_ALPHABET: usize = 286;

/// Distance alphabet size.
pub const DISTANCE_ALPHABET: usize = 30;

/// Order of code length codes for dynamic Huffman.
const CODE_LENGTH_ORDER: [usize; 19] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/// All codes of a single bit length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CodeRange {
    first: u32,
    symbols: Vec<u16>,
}

impl CodeRange {
    #[inline]
    fn get(&self, code: u32) -> Option<u16> {
        let index = code.checked_sub(self.first)?;
        self.symbols.get(index as usize).copied()
    }
}

/// Canonical Huffman decoding table.
///
/// `ranges[k]` holds the codes of length `min_length + k`. An empty table
/// (all lengths zero) decodes nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeTable {
    min_length: u8,
    ranges: Vec<CodeRange>,
}

impl CodeTable {
    /// Build a table from per-symbol code lengths (0 = unused symbol).
    ///
    /// Fails if a length exceeds [`MAX_CODE_LENGTH`] or the lengths are
    /// over-subscribed. Incomplete codes are accepted.
    pub fn from_lengths(lengths: &[u8]) -> Result<Self> {
        if let Some(&len) = lengths.iter().find(|&&len| len > MAX_CODE_LENGTH) {
            return Err(Error::InvalidCodeLengths(format!(
                "code length {len} exceeds {MAX_CODE_LENGTH}"
            )));
        }

        let bl_count = count_lengths(lengths);
        let mut left = 1i32;
        for &count in &bl_count[1..] {
            left = (left << 1) - i32::from(count);
            if left < 0 {
                return Err(Error::InvalidCodeLengths("over-subscribed code".into()));
            }
        }

        Ok(Self::canonical(lengths))
    }

    /// Canonical code assignment for lengths already known to be valid.
    fn canonical(lengths: &[u8]) -> Self {
        let Some(min_length) = lengths.iter().copied().filter(|&len| len > 0).min() else {
            return Self::default();
        };
        let max_length = lengths.iter().copied().max().unwrap_or(min_length);
        let bl_count = count_lengths(lengths);

        // First code of each length.
        let mut next_code = [0u32; MAX_CODE_LENGTH as usize + 1];
        let mut code = 0u32;
        for bits in 1..=max_length as usize {
            code = (code + u32::from(bl_count[bits - 1])) << 1;
            next_code[bits] = code;
        }

        let mut ranges: Vec<CodeRange> = (min_length..=max_length)
            .map(|len| CodeRange {
                first: next_code[len as usize],
                symbols: Vec::with_capacity(usize::from(bl_count[len as usize])),
            })
            .collect();

        for (symbol, &len) in lengths.iter().enumerate() {
            if len > 0 {
                ranges[usize::from(len - min_length)]
                    .symbols
                    .push(symbol as u16);
            }
        }

        Self { min_length, ranges }
    }

    /// Shortest code length in the table (0 when empty).
    pub fn min_length(&self) -> u8 {
        self.min_length
    }

    /// Longest code length in the table (0 when empty).
    pub fn max_length(&self) -> u8 {
        if self.ranges.is_empty() {
            0
        } else {
            self.min_length + self.ranges.len() as u8 - 1
        }
    }

    /// True when no symbol has a code.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Symbol for the `length`-bit code `code`, if any.
    pub fn lookup(&self, length: u8, code: u32) -> Option<u16> {
        let k = length.checked_sub(self.min_length)?;
        self.ranges.get(usize::from(k))?.get(code)
    }
}

fn count_lengths(lengths: &[u8]) -> [u16; MAX_CODE_LENGTH as usize + 1] {
    let mut bl_count = [0u16; MAX_CODE_LENGTH as usize + 1];
    for &len in lengths {
        if len > 0 {
            bl_count[usize::from(len)] += 1;
        }
    }
    bl_count
}

static FIXED_LITERAL_LENGTH: LazyLock<CodeTable> = LazyLock::new(|| {
    let mut lengths = [0u8; 288];
    // Codes 0-143: 8 bits
    lengths[..144].fill(8);
    // Codes 144-255: 9 bits
    lengths[144..256].fill(9);
    // Codes 256-279: 7 bits
    lengths[256..280].fill(7);
    // Codes 280-287: 8 bits
    lengths[280..].fill(8);
    CodeTable::canonical(&lengths)
});

static FIXED_DISTANCE: LazyLock<CodeTable> = LazyLock::new(|| CodeTable::canonical(&[5; 32]));

/// Literal/length table of fixed-Huffman blocks.
pub fn fixed_literal_length_table() -> &'static CodeTable {
    &FIXED_LITERAL_LENGTH
}

/// Distance table of fixed-Huffman blocks.
pub fn fixed_distance_table() -> &'static CodeTable {
    &FIXED_DISTANCE
}

/// Decode one Huffman-coded symbol.
///
/// Reads `min_length` bits, then one more bit at a time, probing each
/// length until a code matches.
pub fn read_symbol(cursor: &mut BitCursor, table: &CodeTable) -> ReadResult<u16> {
    cursor.transaction(|cursor| {
        if table.is_empty() {
            return Err(Error::UndecodableSymbol.into());
        }

        let mut code = cursor.read_bits(table.min_length - 1)?;
        for range in &table.ranges {
            code = (code << 1) | cursor.read_bits(1)?;
            if let Some(symbol) = range.get(code) {
                return Ok(symbol);
            }
        }
        Err(Error::UndecodableSymbol.into())
    })
}

/// Resolve a length or distance code plus its extra bits.
///
/// Codes come in groups of `group_size`; each group past the first two
/// doubles the span of the previous one and needs one more extra bit.
/// `code` is zero-based within the alphabet.
pub fn read_grouped_value(
    cursor: &mut BitCursor,
    code: u16,
    group_size: u16,
    base: u32,
) -> ReadResult<u32> {
    let extra_bits = code.saturating_sub(group_size) / group_size;
    if extra_bits == 0 {
        return Ok(base + u32::from(code));
    }

    let extra = u32::from(extra_bits);
    let group = u32::from(group_size);
    let group_index = u32::from(code % group_size);
    let value = base + u32::from(code) - (extra + 1) * group - group_index
        + (1 << extra) * (group + group_index);
    Ok(value + cursor.read_number(extra_bits as u8)?)
}

/// Match length for literal/length `symbol` (257-285).
pub fn read_length(cursor: &mut BitCursor, symbol: u16) -> ReadResult<u16> {
    debug_assert!((END_OF_BLOCK + 1..=MAX_LENGTH_SYMBOL).contains(&symbol));
    if symbol == MAX_LENGTH_SYMBOL {
        return Ok(258);
    }
    Ok(read_grouped_value(cursor, symbol - 257, 4, 3)? as u16)
}

/// Decode a distance symbol and its extra bits.
pub fn read_distance(cursor: &mut BitCursor, table: &CodeTable) -> ReadResult<u32> {
    cursor.transaction(|cursor| {
        let symbol = read_symbol(cursor, table)?;
        if usize::from(symbol) >= DISTANCE_ALPHABET {
            return Err(Error::InvalidSymbol(symbol).into());
        }
        read_grouped_value(cursor, symbol, 2, 1)
    })
}

/// Read the code length code lengths of a dynamic block header.
///
/// `hclen` is the raw 4-bit header field; `hclen + 4` lengths follow.
pub fn read_code_length_table(cursor: &mut BitCursor, hclen: u8) -> ReadResult<CodeTable> {
    cursor.transaction(|cursor| {
        let mut lengths = [0u8; 19];
        for &symbol in CODE_LENGTH_ORDER.iter().take(usize::from(hclen) + 4) {
            lengths[symbol] = cursor.read_number(3)? as u8;
        }
        Ok(CodeTable::from_lengths(&lengths)?)
    })
}

/// Run-length state of the code length sequence.
///
/// RFC 1951 lets a repeat run cross from the literal/length lengths into
/// the distance lengths, so the state left over from one alphabet seeds the
/// next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LengthRun {
    previous: Option<u8>,
    value: u8,
    remaining: u8,
}

impl LengthRun {
    /// True if the last repeat code still owes lengths.
    pub fn is_pending(&self) -> bool {
        self.remaining > 0
    }
}

fn next_run(
    cursor: &mut BitCursor,
    code_lengths: &CodeTable,
    previous: Option<u8>,
) -> ReadResult<LengthRun> {
    let symbol = read_symbol(cursor, code_lengths)?;
    let (value, remaining) = match symbol {
        0..=15 => (symbol as u8, 1),
        16 => {
            // Repeat previous length 3-6 times
            let Some(prev) = previous else {
                return Err(Error::InvalidCodeLengths("repeat code at start".into()).into());
            };
            (prev, cursor.read_number(2)? + 3)
        }
        // Repeat zero 3-10 times
        17 => (0, cursor.read_number(3)? + 3),
        // Repeat zero 11-138 times
        18 => (0, cursor.read_number(7)? + 11),
        _ => return Err(Error::InvalidSymbol(symbol).into()),
    };
    Ok(LengthRun {
        previous,
        value,
        remaining: remaining as u8,
    })
}

/// Decode `count` run-length coded code lengths and build their table.
///
/// Slots from `count` up to `alphabet_size` stay unused. Returns the table
/// together with the run state to seed the next alphabet.
pub fn read_alphabet(
    cursor: &mut BitCursor,
    code_lengths: &CodeTable,
    count: usize,
    alphabet_size: usize,
    run: LengthRun,
) -> ReadResult<(CodeTable, LengthRun)> {
    cursor.transaction(|cursor| {
        let mut lengths = vec![0u8; alphabet_size.max(count)];
        let mut run = run;
        for slot in lengths.iter_mut().take(count) {
            if !run.is_pending() {
                run = next_run(cursor, code_lengths, run.previous)?;
            }
            *slot = run.value;
            run.remaining -= 1;
            run.previous = Some(run.value);
        }
        Ok((CodeTable::from_lengths(&lengths)?, run))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReadError;

    #[test]
    fn test_canonical_table_layout() {
        let table = CodeTable::from_lengths(&[3, 3, 3, 3, 3, 2, 4, 4]).unwrap();

        assert_eq!(table.min_length(), 2);
        assert_eq!(table.max_length(), 4);
        assert_eq!(table.lookup(2, 0), Some(5));
        assert_eq!(table.lookup(2, 1), None);
        for (code, symbol) in (2..=6).zip(0..=4) {
            assert_eq!(table.lookup(3, code), Some(symbol));
        }
        assert_eq!(table.lookup(3, 1), None);
        assert_eq!(table.lookup(3, 7), None);
        assert_eq!(table.lookup(4, 14), Some(6));
        assert_eq!(table.lookup(4, 15), Some(7));
        assert_eq!(table.lookup(1, 0), None);
    }

    #[test]
    fn test_huffman_table_empty() {
        let table = CodeTable::from_lengths(&[0, 0, 0]).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.max_length(), 0);

        let mut cursor = BitCursor::new(vec![0]);
        assert_eq!(
            read_symbol(&mut cursor, &table),
            Err(ReadError::Fatal(Error::UndecodableSymbol))
        );
    }

    #[test]
    fn test_huffman_table_rejects_bad_lengths() {
        assert!(matches!(
            CodeTable::from_lengths(&[1, 1, 1]),
            Err(Error::InvalidCodeLengths(_))
        ));
        assert!(matches!(
            CodeTable::from_lengths(&[16, 1]),
            Err(Error::InvalidCodeLengths(_))
        ));
    }

    #[test]
    fn test_huffman_table_single_symbol() {
        let table = CodeTable::from_lengths(&[0, 1]).unwrap();
        assert_eq!(table.lookup(1, 0), Some(1));

        let mut cursor = BitCursor::new(vec![0b10]);
        assert_eq!(read_symbol(&mut cursor, &table).unwrap(), 1);
        assert_eq!(
            read_symbol(&mut cursor, &table),
            Err(ReadError::Fatal(Error::UndecodableSymbol))
        );
    }

    #[test]
    fn test_grouped_value_distance_bases() {
        let expected = [
            1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025,
            1537, 2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577,
        ];
        for (code, &value) in expected.iter().enumerate() {
            let mut cursor = BitCursor::new(vec![0, 0]);
            assert_eq!(
                read_grouped_value(&mut cursor, code as u16, 2, 1).unwrap(),
                value,
                "distance code {code}"
            );
        }
    }

    #[test]
    fn test_grouped_value_length_bases() {
        let expected = [
            3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99,
            115, 131, 163, 195, 227,
        ];
        for (code, &value) in expected.iter().enumerate() {
            let mut cursor = BitCursor::new(vec![0, 0]);
            assert_eq!(
                read_grouped_value(&mut cursor, code as u16, 4, 3).unwrap(),
                value,
                "length code {code}"
            );
        }
    }

    #[test]
    fn test_grouped_value_extra_bits() {
        // Distance code 29: base 24577 with 13 extra bits, all set.
        let mut cursor = BitCursor::new(vec![0xFF, 0xFF]);
        assert_eq!(read_grouped_value(&mut cursor, 29, 2, 1).unwrap(), 32768);

        // Length code 27 (symbol 284): base 227 with 5 extra bits = 30.
        let mut cursor = BitCursor::new(vec![0b11110]);
        assert_eq!(read_grouped_value(&mut cursor, 27, 4, 3).unwrap(), 257);
    }

    #[test]
    fn test_read_length_max_symbol() {
        let mut cursor = BitCursor::default();
        assert_eq!(read_length(&mut cursor, 285).unwrap(), 258);
        assert_eq!(read_length(&mut cursor, 257).unwrap(), 3);
    }

    #[test]
    fn test_fixed_literal_length_decode() {
        let cases: [(&[u8], u16); 8] = [
            (&[0b00000000], 256),
            (&[0b01110100], 279),
            (&[0b00001100], 0),
            (&[0b11111101], 143),
            (&[0b00000011], 280),
            (&[0b11100011], 287),
            (&[0b00010011, 0b00000000], 144),
            (&[0b11111111, 0b00000001], 255),
        ];
        for (input, expected) in cases {
            let mut cursor = BitCursor::new(input.to_vec());
            assert_eq!(
                read_symbol(&mut cursor, fixed_literal_length_table()).unwrap(),
                expected,
                "input {input:?}"
            );
        }
    }

    #[test]
    fn test_fixed_distance_decode() {
        let cases: [(&[u8], u32); 27] = [
            (&[0b00000000], 1),
            (&[0b00000100], 5),
            (&[0b11110100], 8),
            (&[0b00001100], 9),
            (&[0b11111100], 16),
            (&[0b00000010], 17),
            (&[0b11110010], 32),
            (&[0b00001010, 0x00], 33),
            (&[0b11111010, 0xFF], 64),
            (&[0b00000110, 0x00], 65),
            (&[0b11110110, 0xFF], 128),
            (&[0b00001110, 0x00], 129),
            (&[0b11111110, 0xFF], 256),
            (&[0b00000001, 0x00], 257),
            (&[0b11110001, 0xFF], 512),
            (&[0b00001001, 0x00], 513),
            (&[0b11111001, 0xFF], 1024),
            (&[0b00000101, 0x00], 1025),
            (&[0b11110101, 0xFF], 2048),
            (&[0b00001101, 0x00], 2049),
            (&[0b11111101, 0xFF], 4096),
            (&[0b00000011, 0x00], 4097),
            (&[0b11110011, 0xFF], 8192),
            (&[0b00001011, 0x00, 0x00], 8193),
            (&[0b11111011, 0xFF, 0xFF], 16384),
            (&[0b00000111, 0x00, 0x00], 16385),
            (&[0b11110111, 0xFF, 0xFF], 32768),
        ];
        for (input, expected) in cases {
            let mut cursor = BitCursor::new(input.to_vec());
            assert_eq!(
                read_distance(&mut cursor, fixed_distance_table()).unwrap(),
                expected,
                "input {input:?}"
            );
        }
    }

    #[test]
    fn test_fixed_distance_rejects_symbols_30_and_31() {
        // Code 11110 = symbol 30.
        let mut cursor = BitCursor::new(vec![0b01111]);
        assert_eq!(
            read_distance(&mut cursor, fixed_distance_table()),
            Err(ReadError::Fatal(Error::InvalidSymbol(30)))
        );
    }

    #[test]
    fn test_read_symbol_restores_on_short_input() {
        // Symbol 144 needs 9 bits.
        let mut cursor = BitCursor::new(vec![0b00010011]);
        assert_eq!(
            read_symbol(&mut cursor, fixed_literal_length_table()),
            Err(ReadError::EndOfStream)
        );
        assert_eq!(cursor.consumed_bytes(), 0);

        cursor.push(&[0]);
        assert_eq!(
            read_symbol(&mut cursor, fixed_literal_length_table()).unwrap(),
            144
        );
    }

    #[test]
    fn test_read_distance_restores_on_missing_extra_bits() {
        // Symbol 29 is read from the first byte but its 13 extra bits are not
        // all buffered.
        let mut cursor = BitCursor::new(vec![0b11110111, 0xFF]);
        assert_eq!(
            read_distance(&mut cursor, fixed_distance_table()),
            Err(ReadError::EndOfStream)
        );
        cursor.push(&[0xFF]);
        assert_eq!(
            read_distance(&mut cursor, fixed_distance_table()).unwrap(),
            32768
        );
    }

    #[test]
    fn test_read_code_length_table() {
        // hclen = 0: lengths for symbols 16, 17, 18, 0 = 1, 2, 2, 0.
        let mut cursor = BitCursor::new(vec![145, 0]);
        let table = read_code_length_table(&mut cursor, 0).unwrap();

        assert_eq!(table.min_length(), 1);
        assert_eq!(table.lookup(1, 0), Some(16));
        assert_eq!(table.lookup(2, 2), Some(17));
        assert_eq!(table.lookup(2, 3), Some(18));
    }

    /// Code length table: 2 -> `0`, 16 -> `10`, 18 -> `11`.
    fn run_length_table() -> CodeTable {
        let mut lengths = [0u8; 19];
        lengths[2] = 1;
        lengths[16] = 2;
        lengths[18] = 2;
        CodeTable::from_lengths(&lengths).unwrap()
    }

    #[test]
    fn test_read_alphabet_runs() {
        // `2`, `16` x3, `18` x11.
        let mut cursor = BitCursor::new(vec![98, 0]);
        let (table, run) =
            read_alphabet(&mut cursor, &run_length_table(), 15, 15, LengthRun::default()).unwrap();

        assert!(!run.is_pending());
        assert_eq!(table.min_length(), 2);
        assert_eq!(table.max_length(), 2);
        for symbol in 0..4 {
            assert_eq!(table.lookup(2, u32::from(symbol)), Some(symbol));
        }
    }

    #[test]
    fn test_read_alphabet_run_carries_over() {
        let mut cursor = BitCursor::new(vec![98, 0]);
        let cl_table = run_length_table();
        let (_, run) = read_alphabet(&mut cursor, &cl_table, 10, 10, LengthRun::default()).unwrap();
        assert!(run.is_pending());

        // The five zeros still owed come from the carried run, not the input.
        let consumed = cursor.consumed_bytes();
        let (table, run) = read_alphabet(&mut cursor, &cl_table, 5, 5, run).unwrap();
        assert!(table.is_empty());
        assert!(!run.is_pending());
        assert_eq!(cursor.consumed_bytes(), consumed);
    }

    #[test]
    fn test_read_alphabet_repeat_without_previous() {
        // `16` followed by two zero extra bits.
        let mut cursor = BitCursor::new(vec![0b0000_0001]);
        assert!(matches!(
            read_alphabet(&mut cursor, &run_length_table(), 4, 4, LengthRun::default()),
            Err(ReadError::Fatal(Error::InvalidCodeLengths(_)))
        ));
    }

    #[test]
    fn test_read_alphabet_restores_on_short_input() {
        let mut cursor = BitCursor::new(vec![98]);
        assert_eq!(
            read_alphabet(&mut cursor, &run_length_table(), 15, 15, LengthRun::default()),
            Err(ReadError::EndOfStream)
        );
        assert_eq!(cursor.consumed_bytes(), 0);

        cursor.push(&[0]);
        assert!(
            read_alphabet(&mut cursor, &run_length_table(), 15, 15, LengthRun::default()).is_ok()
        );
    }
}
