//! Pure encode/decode strategies between structured values and the raw
//! byte strings exchanged with a device.
//!
//! Codecs never perform I/O. Decoding is total over the byte strings a
//! well-behaved device produces; encoding rejects values outside the
//! declared domain. For every codec, decoding an encoded value yields the
//! value back.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::value::{Choice, Value};

/// The number of bytes needed to represent an unsigned value.
fn bytes_for(value: u32) -> usize {
    match value {
        0..=0xff => 1,
        0x100..=0xffff => 2,
        0x1_0000..=0xff_ffff => 3,
        _ => 4,
    }
}

/// Reads a big-endian unsigned integer of `count` bytes.
fn be_uint(raw: &[u8], count: usize) -> Result<u64, CodecError> {
    if raw.len() < count {
        return Err(CodecError::TooShort {
            expected: count,
            actual: raw.len(),
        });
    }

    Ok(raw[..count].iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
}

/// Writes a big-endian unsigned integer into `count` bytes.
fn be_bytes(value: u64, count: usize) -> Vec<u8> {
    (0..count)
        .rev()
        .map(|shift| (value >> (shift * 8)) as u8)
        .collect()
}

/// Maps an on/off toggle onto raw byte patterns.
///
/// The mask selects which bits of the raw value belong to the setting.
/// When the mask does not cover all bits, encoding merges the pattern into
/// the current raw value so unrelated bits survive a write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BooleanCodec {
    /// The raw pattern representing `true`.
    pub true_value: Vec<u8>,

    /// The raw pattern representing `false`.
    pub false_value: Vec<u8>,

    /// The bits of the raw value that carry the setting.
    pub mask: Vec<u8>,
}

impl Default for BooleanCodec {
    fn default() -> Self {
        Self::new(vec![0x01], vec![0x00], vec![0xff])
    }
}

impl BooleanCodec {
    /// Creates a codec from explicit byte patterns. All three must have the
    /// same length.
    pub fn new(true_value: Vec<u8>, false_value: Vec<u8>, mask: Vec<u8>) -> Self {
        debug_assert!(true_value.len() == false_value.len() && true_value.len() == mask.len());

        Self {
            true_value,
            false_value,
            mask,
        }
    }

    /// Creates a single-byte codec where `true` is a bit pattern inside a
    /// mask and `false` is all-zero.
    pub fn flag(true_value: u8, mask: u8) -> Self {
        Self::new(vec![true_value], vec![0x00], vec![mask])
    }

    /// Whether encoding needs the current raw value to preserve bits the
    /// mask does not cover.
    pub fn needs_current(&self) -> bool {
        self.mask.iter().any(|&b| b != 0xff)
    }

    /// Decodes a raw value by masking it and comparing against the `true`
    /// pattern. Bits outside the mask are ignored.
    pub fn decode(&self, raw: &[u8]) -> Result<bool, CodecError> {
        let count = self.mask.len();
        if raw.len() < count {
            return Err(CodecError::TooShort {
                expected: count,
                actual: raw.len(),
            });
        }

        let matches = (0..count).all(|i| raw[i] & self.mask[i] == self.true_value[i] & self.mask[i]);
        Ok(matches)
    }

    /// Encodes a toggle, merging the pattern into `current` where the mask
    /// leaves bits unspecified. Without a current value those bits are
    /// written as zero.
    pub fn encode(&self, value: bool, current: Option<&[u8]>) -> Vec<u8> {
        let pattern = if value { &self.true_value } else { &self.false_value };

        (0..self.mask.len())
            .map(|i| {
                let base = current.and_then(|cur| cur.get(i).copied()).unwrap_or(0);
                (base & !self.mask[i]) | (pattern[i] & self.mask[i])
            })
            .collect()
    }
}

/// Maps an integer in an inclusive range onto big-endian bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RangeCodec {
    /// The smallest allowed value.
    pub min: u32,

    /// The largest allowed value.
    pub max: u32,

    /// The number of bytes the value occupies.
    pub byte_count: usize,
}

impl RangeCodec {
    /// Creates a codec for `min..=max` stored in `byte_count` bytes.
    pub fn new(min: u32, max: u32, byte_count: usize) -> Self {
        Self {
            min,
            max,
            byte_count,
        }
    }

    /// Decodes a raw value. Values outside the range indicate a device
    /// inconsistency and are rejected.
    pub fn decode(&self, raw: &[u8]) -> Result<i64, CodecError> {
        let value = be_uint(raw, self.byte_count)? as i64;
        self.check(value)?;
        Ok(value)
    }

    /// Encodes a value, rejecting anything outside `min..=max`.
    pub fn encode(&self, value: i64) -> Result<Vec<u8>, CodecError> {
        self.check(value)?;
        Ok(be_bytes(value as u64, self.byte_count))
    }

    fn check(&self, value: i64) -> Result<(), CodecError> {
        if value < i64::from(self.min) || value > i64::from(self.max) {
            return Err(CodecError::OutOfRange {
                value,
                min: i64::from(self.min),
                max: i64::from(self.max),
            });
        }

        Ok(())
    }
}

/// Maps a finite set of named integers onto big-endian bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChoiceCodec {
    /// The allowed choices, in presentation order.
    pub choices: Vec<Choice>,

    /// The number of bytes the choice value occupies.
    pub byte_count: usize,

    /// The number of leading reply bytes to skip before the value.
    pub read_skip_bytes: usize,

    /// Bytes to prepend to every encoded value.
    pub write_prefix: Vec<u8>,

    /// The choice to fall back to when the device reports a value outside
    /// the list. Without a fallback such a value is an error.
    pub fallback: Option<u32>,
}

impl ChoiceCodec {
    /// Creates a codec over a choice list. The byte count defaults to the
    /// width of the largest choice value.
    pub fn new(choices: Vec<Choice>) -> Self {
        let byte_count = choices.iter().map(|c| bytes_for(c.value)).max().unwrap_or(1);

        Self {
            choices,
            byte_count,
            read_skip_bytes: 0,
            write_prefix: Vec::new(),
            fallback: None,
        }
    }

    fn contains(&self, value: u32) -> bool {
        self.choices.iter().any(|c| c.value == value)
    }

    /// Decodes a raw value into the integer of the matching choice.
    pub fn decode(&self, raw: &[u8]) -> Result<u32, CodecError> {
        if raw.len() < self.read_skip_bytes {
            return Err(CodecError::TooShort {
                expected: self.read_skip_bytes + self.byte_count,
                actual: raw.len(),
            });
        }

        let value = be_uint(&raw[self.read_skip_bytes..], self.byte_count)? as u32;
        if self.contains(value) {
            return Ok(value);
        }

        self.fallback.ok_or(CodecError::UnknownChoice(value))
    }

    /// Encodes a choice, rejecting values outside the list.
    pub fn encode(&self, value: u32) -> Result<Vec<u8>, CodecError> {
        if !self.contains(value) {
            return Err(CodecError::UnknownChoice(value));
        }

        let mut data = self.write_prefix.clone();
        data.extend(be_bytes(u64::from(value), self.byte_count));
        Ok(data)
    }
}

/// Maps keyed choices onto big-endian bytes, one (key, value) entry per
/// exchange.
///
/// Used for map-shaped settings such as key remapping, where every key has
/// its own list of allowed values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChoiceMapCodec {
    /// The allowed choices per key.
    pub choices: BTreeMap<u16, Vec<Choice>>,

    /// The number of bytes a key occupies.
    pub key_byte_count: usize,

    /// The number of bytes a choice value occupies.
    pub byte_count: usize,

    /// The number of leading reply bytes to skip before the value.
    pub read_skip_bytes: usize,

    /// Bytes to prepend to every encoded value.
    pub write_prefix: Vec<u8>,

    /// A raw value accepted when reading but never offered as a write
    /// target (typically the device's "not remapped" sentinel).
    pub extra_default: Option<u32>,
}

impl ChoiceMapCodec {
    /// Creates a codec over per-key choice lists with single-byte keys and
    /// values.
    pub fn new(choices: BTreeMap<u16, Vec<Choice>>) -> Self {
        Self {
            choices,
            key_byte_count: 1,
            byte_count: 1,
            read_skip_bytes: 0,
            write_prefix: Vec::new(),
            extra_default: None,
        }
    }

    /// The keys of the map, in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = u16> + '_ {
        self.choices.keys().copied()
    }

    /// Decodes the raw value read for one key.
    pub fn decode_entry(&self, key: u16, raw: &[u8]) -> Result<u32, CodecError> {
        let allowed = self.choices.get(&key).ok_or(CodecError::UnknownKey(key))?;

        if raw.len() < self.read_skip_bytes {
            return Err(CodecError::TooShort {
                expected: self.read_skip_bytes + self.byte_count,
                actual: raw.len(),
            });
        }

        let value = be_uint(&raw[self.read_skip_bytes..], self.byte_count)? as u32;
        if allowed.iter().any(|c| c.value == value) || self.extra_default == Some(value) {
            return Ok(value);
        }

        Err(CodecError::UnknownChoice(value))
    }

    /// Encodes the value to write for one key. The extra default is not a
    /// valid write target.
    pub fn encode_entry(&self, key: u16, value: u32) -> Result<Vec<u8>, CodecError> {
        let allowed = self.choices.get(&key).ok_or(CodecError::UnknownKey(key))?;
        if !allowed.iter().any(|c| c.value == value) {
            return Err(CodecError::UnknownChoice(value));
        }

        let mut data = self.write_prefix.clone();
        data.extend(be_bytes(u64::from(value), self.byte_count));
        Ok(data)
    }
}

/// Maps a set of independent toggles onto a bit field.
///
/// Each flag's integer is its bit pattern within the field. Bits not
/// covered by a declared flag decode as absent and cannot be altered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitFieldCodec {
    /// The declared flags, each the bit pattern it occupies.
    pub flags: Vec<u32>,

    /// The number of bytes the bit field occupies.
    pub byte_count: usize,
}

impl BitFieldCodec {
    /// Creates a codec over mask-valued flags. The byte count defaults to
    /// the width of the widest flag.
    pub fn new(flags: Vec<u32>) -> Self {
        let byte_count = flags.iter().map(|&f| bytes_for(f)).max().unwrap_or(1);

        Self {
            flags,
            byte_count,
        }
    }

    /// Unpacks the declared flags from a raw bit field.
    pub fn decode(&self, raw: &[u8]) -> Result<BTreeMap<u32, bool>, CodecError> {
        let bits = be_uint(raw, self.byte_count)? as u32;

        Ok(self.flags.iter().map(|&f| (f, bits & f != 0)).collect())
    }

    /// Packs flag states back into the bit field. Flags outside the
    /// declared set are rejected; missing flags are written as disabled.
    pub fn encode(&self, value: &BTreeMap<u32, bool>) -> Result<Vec<u8>, CodecError> {
        if let Some(&unknown) = value.keys().find(|k| !self.flags.contains(k)) {
            return Err(CodecError::UnknownChoice(unknown));
        }

        let bits = self
            .flags
            .iter()
            .filter(|f| value.get(f) == Some(&true))
            .fold(0u32, |acc, &f| acc | f);

        Ok(be_bytes(u64::from(bits), self.byte_count))
    }
}

/// A toggle whose bit lives at an explicit position inside a longer
/// record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlagAt {
    /// The identifier the flag is reported under.
    pub flag: u32,

    /// The byte offset of the flag within the record.
    pub offset: u8,

    /// The bit of the addressed byte that carries the flag.
    pub mask: u8,
}

/// Maps toggles spread across a longer record onto per-offset exchanges.
///
/// Used when one logical setting spans several sub-records, such as one
/// enable bit per gesture capability. Reads address one offset at a time;
/// writes carry `(offset, mask, bits)` per touched offset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitFieldOffsetMaskCodec {
    /// The declared flags with their positions.
    pub flags: Vec<FlagAt>,
}

impl BitFieldOffsetMaskCodec {
    /// Creates a codec over positioned flags.
    pub fn new(flags: Vec<FlagAt>) -> Self {
        Self {
            flags,
        }
    }

    /// The distinct byte offsets that have to be read, in declaration
    /// order.
    pub fn offsets(&self) -> Vec<u8> {
        let mut offsets = Vec::new();
        for flag in &self.flags {
            if !offsets.contains(&flag.offset) {
                offsets.push(flag.offset);
            }
        }
        offsets
    }

    /// Unpacks the flags from the byte read at each offset.
    pub fn decode(&self, replies: &BTreeMap<u8, u8>) -> Result<BTreeMap<u32, bool>, CodecError> {
        self.flags
            .iter()
            .map(|f| {
                let byte = replies.get(&f.offset).ok_or(CodecError::TooShort {
                    expected: usize::from(f.offset) + 1,
                    actual: replies.len(),
                })?;
                Ok((f.flag, byte & f.mask != 0))
            })
            .collect()
    }

    /// Packs flag states into one `(offset, mask, bits)` write per touched
    /// offset. Flags outside the declared set are rejected.
    pub fn encode(&self, value: &BTreeMap<u32, bool>) -> Result<Vec<(u8, u8, u8)>, CodecError> {
        if let Some(&unknown) = value
            .keys()
            .find(|k| !self.flags.iter().any(|f| f.flag == **k))
        {
            return Err(CodecError::UnknownChoice(unknown));
        }

        let mut writes: Vec<(u8, u8, u8)> = Vec::new();
        for flag in &self.flags {
            let enabled = value.get(&flag.flag) == Some(&true);
            match writes.iter_mut().find(|(offset, ..)| *offset == flag.offset) {
                Some((_, mask, bits)) => {
                    *mask |= flag.mask;
                    if enabled {
                        *bits |= flag.mask;
                    }
                },
                None => {
                    writes.push((flag.offset, flag.mask, if enabled { flag.mask } else { 0 }));
                },
            }
        }

        Ok(writes)
    }
}

/// A single named numeric sub-field of a multi-range parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubParam {
    /// The name of the sub-field.
    pub name: &'static str,

    /// The number of bytes the sub-field occupies.
    pub byte_count: usize,

    /// Whether the sub-field is a signed (two's complement) integer.
    pub signed: bool,

    /// The smallest allowed value, if bounded.
    pub min: Option<i64>,

    /// The largest allowed value, if bounded.
    pub max: Option<i64>,
}

impl SubParam {
    fn check(&self, value: i64) -> Result<(), CodecError> {
        let min = self.min.unwrap_or(i64::MIN);
        let max = self.max.unwrap_or(i64::MAX);
        if value < min || value > max {
            return Err(CodecError::OutOfRange {
                value,
                min,
                max,
            });
        }

        Ok(())
    }
}

/// One parameter of a multi-range setting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MultiRangeItem {
    /// The identifier the parameter is reported under.
    pub id: u8,

    /// The selector byte used to address the parameter on the device.
    pub selector: u8,

    /// The layout of the parameter's record.
    pub sub_params: &'static [SubParam],
}

/// Maps records of named numeric sub-fields onto per-parameter exchanges.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultiRangeCodec {
    /// The declared parameters.
    pub items: Vec<MultiRangeItem>,
}

impl MultiRangeCodec {
    /// Creates a codec over the declared parameters.
    pub fn new(items: Vec<MultiRangeItem>) -> Self {
        Self {
            items,
        }
    }

    fn item(&self, id: u8) -> Result<&MultiRangeItem, CodecError> {
        self.items
            .iter()
            .find(|i| i.id == id)
            .ok_or(CodecError::UnknownKey(u16::from(id)))
    }

    /// Decodes the record read for one parameter into its named
    /// sub-fields.
    pub fn decode_item(
        &self,
        id: u8,
        raw: &[u8],
    ) -> Result<BTreeMap<&'static str, i64>, CodecError> {
        let item = self.item(id)?;

        let mut fields = BTreeMap::new();
        let mut offset = 0;
        for sub in item.sub_params {
            let unsigned = be_uint(raw.get(offset..).unwrap_or(&[]), sub.byte_count)?;
            let value = if sub.signed {
                let width = (sub.byte_count * 8) as u32;
                ((unsigned << (64 - width)) as i64) >> (64 - width)
            } else {
                unsigned as i64
            };

            fields.insert(sub.name, value);
            offset += sub.byte_count;
        }

        Ok(fields)
    }

    /// Encodes the sub-fields of one parameter back into its record,
    /// rejecting out-of-bounds values and unknown field names.
    pub fn encode_item(
        &self,
        id: u8,
        fields: &BTreeMap<&'static str, i64>,
    ) -> Result<Vec<u8>, CodecError> {
        let item = self.item(id)?;

        if fields
            .keys()
            .any(|name| !item.sub_params.iter().any(|sub| sub.name == *name))
        {
            return Err(CodecError::WrongShape);
        }

        let mut data = Vec::new();
        for sub in item.sub_params {
            let value = fields.get(sub.name).copied().ok_or(CodecError::WrongShape)?;
            sub.check(value)?;
            data.extend(be_bytes(value as u64, sub.byte_count));
        }

        Ok(data)
    }
}

/// The smallest ratchet threshold, presented for the freespin mode.
pub const SMART_SHIFT_MIN: i64 = 0;

/// The largest presentable ratchet threshold.
pub const SMART_SHIFT_MAX: i64 = 50;

/// Maps the wheel's raw (mode, threshold, threshold) record onto a single
/// bounded integer.
///
/// Freespin mode reads as the minimum. Writing the minimum selects
/// freespin; writing the maximum selects permanent ratchet mode, which the
/// device encodes as a threshold of 255. Every other value selects ratchet
/// mode with the literal threshold, duplicated into both threshold bytes
/// of the record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SmartShiftCodec;

impl SmartShiftCodec {
    /// Decodes the raw record into a threshold, capping at the maximum.
    pub fn decode(&self, raw: &[u8]) -> Result<i64, CodecError> {
        if raw.len() < 2 {
            return Err(CodecError::TooShort {
                expected: 2,
                actual: raw.len(),
            });
        }

        if raw[0] == 1 {
            return Ok(SMART_SHIFT_MIN);
        }

        Ok(i64::from(raw[1]).min(SMART_SHIFT_MAX))
    }

    /// Encodes a threshold into the raw record.
    pub fn encode(&self, value: i64) -> Result<Vec<u8>, CodecError> {
        if !(SMART_SHIFT_MIN..=SMART_SHIFT_MAX).contains(&value) {
            return Err(CodecError::OutOfRange {
                value,
                min: SMART_SHIFT_MIN,
                max: SMART_SHIFT_MAX,
            });
        }

        let mode: u8 = if value == SMART_SHIFT_MIN { 1 } else { 2 };
        let threshold: u8 = if value == SMART_SHIFT_MAX { 255 } else { value as u8 };

        Ok(vec![mode, threshold, threshold])
    }
}

/// The codec of a setting with a single scalar value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScalarCodec {
    Boolean(BooleanCodec),
    Range(RangeCodec),
    Choice(ChoiceCodec),
    SmartShift(SmartShiftCodec),
}

impl ScalarCodec {
    /// Whether encoding needs the current raw value first.
    pub fn needs_current(&self) -> bool {
        match self {
            ScalarCodec::Boolean(codec) => codec.needs_current(),
            _ => false,
        }
    }

    /// Decodes a raw value into the codec's value shape.
    pub fn decode(&self, raw: &[u8]) -> Result<Value, CodecError> {
        match self {
            ScalarCodec::Boolean(codec) => codec.decode(raw).map(Value::Bool),
            ScalarCodec::Range(codec) => codec.decode(raw).map(Value::Int),
            ScalarCodec::Choice(codec) => codec.decode(raw).map(Value::Choice),
            ScalarCodec::SmartShift(codec) => codec.decode(raw).map(Value::Int),
        }
    }

    /// Encodes a value of the codec's shape, rejecting any other shape.
    pub fn encode(&self, value: &Value, current: Option<&[u8]>) -> Result<Vec<u8>, CodecError> {
        match (self, value) {
            (ScalarCodec::Boolean(codec), Value::Bool(val)) => Ok(codec.encode(*val, current)),
            (ScalarCodec::Range(codec), Value::Int(val)) => codec.encode(*val),
            (ScalarCodec::Choice(codec), Value::Choice(val)) => codec.encode(*val),
            (ScalarCodec::SmartShift(codec), Value::Int(val)) => codec.encode(*val),
            _ => Err(CodecError::WrongShape),
        }
    }
}

/// Represents a failed translation between a structured value and raw
/// bytes.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum CodecError {
    /// A numeric value lies outside the declared range.
    #[error("value {value} is outside the range {min}..={max}")]
    OutOfRange {
        value: i64,
        min: i64,
        max: i64,
    },

    /// A value is not part of the declared choice or flag set.
    #[error("value {0:#x} is not an available choice")]
    UnknownChoice(u32),

    /// A key is not part of the declared map.
    #[error("key {0:#x} is not part of this setting")]
    UnknownKey(u16),

    /// The raw data ends before the declared layout does.
    #[error("raw data is too short ({actual} of {expected} bytes)")]
    TooShort {
        expected: usize,
        actual: usize,
    },

    /// The structured value has the wrong shape for this codec.
    #[error("the value has the wrong shape for this setting")]
    WrongShape,
}
