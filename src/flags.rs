//! Bitmask tables for the USN reason / source info and file attribute fields.
//!
//! Each table is an ordered static slice, sorted by ascending bit value, so that
//! resolving a value with several bits set always produces the same text.

use std::borrow::Cow;

pub const USN_REASON_DATA_OVERWRITE: u32 = 0x0000_0001;
pub const USN_REASON_DATA_EXTEND: u32 = 0x0000_0002;
pub const USN_REASON_DATA_TRUNCATION: u32 = 0x0000_0004;
pub const USN_REASON_NAMED_DATA_OVERWRITE: u32 = 0x0000_0010;
pub const USN_REASON_NAMED_DATA_EXTEND: u32 = 0x0000_0020;
pub const USN_REASON_NAMED_DATA_TRUNCATION: u32 = 0x0000_0040;
pub const USN_REASON_FILE_CREATE: u32 = 0x0000_0100;
pub const USN_REASON_FILE_DELETE: u32 = 0x0000_0200;
pub const USN_REASON_EA_CHANGE: u32 = 0x0000_0400;
pub const USN_REASON_SECURITY_CHANGE: u32 = 0x0000_0800;
pub const USN_REASON_RENAME_OLD_NAME: u32 = 0x0000_1000;
pub const USN_REASON_RENAME_NEW_NAME: u32 = 0x0000_2000;
pub const USN_REASON_INDEXABLE_CHANGE: u32 = 0x0000_4000;
pub const USN_REASON_BASIC_INFO_CHANGE: u32 = 0x0000_8000;
pub const USN_REASON_HARD_LINK_CHANGE: u32 = 0x0001_0000;
pub const USN_REASON_COMPRESSION_CHANGE: u32 = 0x0002_0000;
pub const USN_REASON_ENCRYPTION_CHANGE: u32 = 0x0004_0000;
pub const USN_REASON_OBJECT_ID_CHANGE: u32 = 0x0008_0000;
pub const USN_REASON_REPARSE_POINT_CHANGE: u32 = 0x0010_0000;
pub const USN_REASON_STREAM_CHANGE: u32 = 0x0020_0000;
pub const USN_REASON_CLOSE: u32 = 0x8000_0000;

pub const FILE_ATTRIBUTE_READONLY: u32 = 0x0000_0001;
pub const FILE_ATTRIBUTE_HIDDEN: u32 = 0x0000_0002;
pub const FILE_ATTRIBUTE_SYSTEM: u32 = 0x0000_0004;
pub const FILE_ATTRIBUTE_DIRECTORY: u32 = 0x0000_0010;
pub const FILE_ATTRIBUTE_ARCHIVE: u32 = 0x0000_0020;
pub const FILE_ATTRIBUTE_DEVICE: u32 = 0x0000_0040;
pub const FILE_ATTRIBUTE_NORMAL: u32 = 0x0000_0080;
pub const FILE_ATTRIBUTE_TEMPORARY: u32 = 0x0000_0100;
pub const FILE_ATTRIBUTE_SPARSE_FILE: u32 = 0x0000_0200;
pub const FILE_ATTRIBUTE_REPARSE_POINT: u32 = 0x0000_0400;
pub const FILE_ATTRIBUTE_COMPRESSED: u32 = 0x0000_0800;
pub const FILE_ATTRIBUTE_OFFLINE: u32 = 0x0000_1000;
pub const FILE_ATTRIBUTE_NOT_CONTENT_INDEXED: u32 = 0x0000_2000;
pub const FILE_ATTRIBUTE_ENCRYPTED: u32 = 0x0000_4000;
pub const FILE_ATTRIBUTE_VIRTUAL: u32 = 0x0001_0000;

/// Text emitted for a mask with no bits set. Kept as a single space so that
/// existing report tooling sees a non-empty column.
pub const EMPTY_MASK_TEXT: &str = " ";

/// An immutable mapping from bit patterns to descriptive text.
#[derive(Debug)]
pub struct FlagTable {
    entries: &'static [(u32, &'static str)],
}

impl FlagTable {
    pub const fn new(entries: &'static [(u32, &'static str)]) -> Self {
        FlagTable { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(u32, &'static str)> {
        self.entries.iter()
    }

    /// Resolves a mask to text.
    ///
    /// An exact match wins. Otherwise every non-zero entry whose bits are all
    /// present in `value` is joined with a single space, in table order.
    /// Bits without an entry are dropped.
    pub fn resolve(&self, value: u32) -> Cow<'static, str> {
        if value == 0 {
            return Cow::Borrowed(EMPTY_MASK_TEXT);
        }

        let entries: &'static [(u32, &'static str)] = self.entries;
        if let Some(&(_, text)) = entries.iter().find(|(bits, _)| *bits == value) {
            return Cow::Borrowed(text);
        }

        let set: Vec<&str> = entries
            .iter()
            .filter(|(bits, _)| *bits != 0 && bits & value == *bits)
            .map(|(_, text)| *text)
            .collect();

        Cow::Owned(set.join(" "))
    }
}

/// USN_REASON_* descriptions, also used for the source info field.
pub static REASON_FLAGS: FlagTable = FlagTable::new(&[
    (0x0000_0000, EMPTY_MASK_TEXT),
    (
        USN_REASON_DATA_OVERWRITE,
        "The data in the file or directory was overwritten.",
    ),
    (USN_REASON_DATA_EXTEND, "The file or directory was added to."),
    (
        USN_REASON_DATA_TRUNCATION,
        "The file or directory was truncated.",
    ),
    (
        USN_REASON_NAMED_DATA_OVERWRITE,
        "Data in one or more named data streams for the file was overwritten.",
    ),
    (
        USN_REASON_NAMED_DATA_EXTEND,
        "One or more named data streams for the file were added to.",
    ),
    (
        USN_REASON_NAMED_DATA_TRUNCATION,
        "One or more named data streams for the file was truncated.",
    ),
    (
        USN_REASON_FILE_CREATE,
        "The file or directory was created for the first time.",
    ),
    (USN_REASON_FILE_DELETE, "The file or directory was deleted."),
    (
        USN_REASON_EA_CHANGE,
        "The user made a change to the file's or directory's extended attributes.",
    ),
    (
        USN_REASON_SECURITY_CHANGE,
        "A change was made in the access rights to the file or directory.",
    ),
    (
        USN_REASON_RENAME_OLD_NAME,
        "The file or directory was renamed and the file name in this structure is the previous name.",
    ),
    (
        USN_REASON_RENAME_NEW_NAME,
        "The file or directory was renamed and the file name in this structure is the new name.",
    ),
    (
        USN_REASON_INDEXABLE_CHANGE,
        "A user toggled the FILE_ATTRIBUTE_NOT_CONTENT_INDEXED attribute.",
    ),
    (
        USN_REASON_BASIC_INFO_CHANGE,
        "A user has either changed one or more file or directory attributes or one or more time stamps.",
    ),
    (
        USN_REASON_HARD_LINK_CHANGE,
        "An NTFS hard link was added to or removed from the file or directory",
    ),
    (
        USN_REASON_COMPRESSION_CHANGE,
        "The compression state of the file or directory was changed from or to compressed.",
    ),
    (
        USN_REASON_ENCRYPTION_CHANGE,
        "The file or directory was encrypted or decrypted.",
    ),
    (
        USN_REASON_OBJECT_ID_CHANGE,
        "The object identifier of the file or directory was changed.",
    ),
    (
        USN_REASON_REPARSE_POINT_CHANGE,
        "The reparse point contained in the file or directory was changed, or a reparse point was added to or deleted from the file or directory.",
    ),
    (
        USN_REASON_STREAM_CHANGE,
        "A named stream has been added to or removed from the file or a named stream has been renamed.",
    ),
    (USN_REASON_CLOSE, "The file or directory was closed."),
]);

pub static FILE_ATTRIBUTE_FLAGS: FlagTable = FlagTable::new(&[
    (FILE_ATTRIBUTE_READONLY, "READONLY"),
    (FILE_ATTRIBUTE_HIDDEN, "HIDDEN"),
    (FILE_ATTRIBUTE_SYSTEM, "SYSTEM"),
    (FILE_ATTRIBUTE_DIRECTORY, "DIRECTORY"),
    (FILE_ATTRIBUTE_ARCHIVE, "ARCHIVE"),
    (FILE_ATTRIBUTE_DEVICE, "DEVICE"),
    (FILE_ATTRIBUTE_NORMAL, "NORMAL"),
    (FILE_ATTRIBUTE_TEMPORARY, "TEMPORARY"),
    (FILE_ATTRIBUTE_SPARSE_FILE, "SPARSE_FILE"),
    (FILE_ATTRIBUTE_REPARSE_POINT, "REPARSE_POINT"),
    (FILE_ATTRIBUTE_COMPRESSED, "COMPRESSED"),
    (FILE_ATTRIBUTE_OFFLINE, "OFFLINE"),
    (FILE_ATTRIBUTE_NOT_CONTENT_INDEXED, "NOT_CONTENT_INDEXED"),
    (FILE_ATTRIBUTE_ENCRYPTED, "ENCRYPTED"),
    (FILE_ATTRIBUTE_VIRTUAL, "VIRTUAL"),
]);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_sizes() {
        assert_eq!(REASON_FLAGS.len(), 22);
        assert_eq!(FILE_ATTRIBUTE_FLAGS.len(), 15);
    }

    #[test]
    fn tables_are_sorted_by_bit_value() {
        for table in [&REASON_FLAGS, &FILE_ATTRIBUTE_FLAGS] {
            let bits: Vec<u32> = table.iter().map(|(bits, _)| *bits).collect();
            let mut sorted = bits.clone();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(bits, sorted);
        }
    }

    #[test]
    fn zero_mask_is_single_space() {
        assert_eq!(REASON_FLAGS.resolve(0), " ");
        assert_eq!(FILE_ATTRIBUTE_FLAGS.resolve(0), " ");
    }

    #[test]
    fn exact_match() {
        assert_eq!(
            REASON_FLAGS.resolve(USN_REASON_DATA_EXTEND),
            "The file or directory was added to."
        );
        assert_eq!(
            REASON_FLAGS.resolve(USN_REASON_CLOSE),
            "The file or directory was closed."
        );
        assert_eq!(FILE_ATTRIBUTE_FLAGS.resolve(0x20), "ARCHIVE");
        assert_eq!(FILE_ATTRIBUTE_FLAGS.resolve(0x4000), "ENCRYPTED");
    }

    #[test]
    fn multiple_bits_join_in_ascending_order() {
        assert_eq!(FILE_ATTRIBUTE_FLAGS.resolve(0x21), "READONLY ARCHIVE");
        assert_eq!(
            FILE_ATTRIBUTE_FLAGS.resolve(FILE_ATTRIBUTE_DIRECTORY | FILE_ATTRIBUTE_HIDDEN),
            "HIDDEN DIRECTORY"
        );

        let text = REASON_FLAGS.resolve(USN_REASON_FILE_CREATE | USN_REASON_CLOSE);
        assert_eq!(
            text,
            "The file or directory was created for the first time. The file or directory was closed."
        );
    }

    #[test]
    fn unknown_bits_are_dropped() {
        // 0x0040_0000 (transacted change) has no entry.
        assert_eq!(
            REASON_FLAGS.resolve(0x0040_0000 | USN_REASON_CLOSE),
            "The file or directory was closed."
        );
        assert_eq!(FILE_ATTRIBUTE_FLAGS.resolve(0x0008_0000), "");
    }
}
