//! Palm Database record table.
//!
//! An HD container is a PDB whose type/creator field reads `RBINCONT`.
//! Records are located through the 8-byte stride table that follows the
//! 78-byte fixed prefix; a record ends where the next one starts, and the
//! last record runs to the end of the file.

use crate::error::{Error, Result};

/// Size of the fixed PDB prefix, up to and including the record count.
pub const PDB_HEADER_LEN: usize = 78;

/// Offset of the 8-byte type/creator identifier.
pub const IDENT_OFFSET: usize = 0x3C;

/// Type/creator identifier of an HD container.
pub const HD_CONTAINER_IDENT: &[u8; 8] = b"RBINCONT";

/// Offset of the big-endian u16 record count.
pub const RECORD_COUNT_OFFSET: usize = 76;

/// Stride of one entry in the record info list.
pub const RECORD_INFO_LEN: usize = 8;

/// Read-only view of an HD container's bytes and record table.
#[derive(Debug, Clone, Copy)]
pub struct Container<'a> {
    data: &'a [u8],
    num_records: u16,
}

/// A single record, borrowed from the container buffer.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub data: &'a [u8],
}

impl<'a> Container<'a> {
    /// Validate the PDB prefix and record table of `data`.
    pub fn open(data: &'a [u8]) -> Result<Self> {
        if data.len() < PDB_HEADER_LEN {
            return Err(Error::NotAContainer(format!(
                "file is {} bytes, shorter than a PDB header",
                data.len()
            )));
        }

        let ident = &data[IDENT_OFFSET..IDENT_OFFSET + HD_CONTAINER_IDENT.len()];
        if ident != HD_CONTAINER_IDENT {
            return Err(Error::NotAContainer(format!(
                "expected RBINCONT, found {:?}",
                String::from_utf8_lossy(ident)
            )));
        }

        let num_records =
            u16::from_be_bytes([data[RECORD_COUNT_OFFSET], data[RECORD_COUNT_OFFSET + 1]]);

        let table_end = PDB_HEADER_LEN + num_records as usize * RECORD_INFO_LEN;
        if data.len() < table_end {
            return Err(Error::Truncated {
                what: "record table",
                needed: table_end,
                available: data.len(),
            });
        }

        log::debug!("opened HD container with {num_records} records");
        Ok(Self { data, num_records })
    }

    /// Database name from the first 32 bytes (NUL-terminated).
    pub fn name(&self) -> String {
        let name = &self.data[..32];
        let end = name.iter().position(|&b| b == 0).unwrap_or(32);
        String::from_utf8_lossy(&name[..end]).into_owned()
    }

    pub fn record_count(&self) -> u16 {
        self.num_records
    }

    fn record_offset(&self, index: usize) -> usize {
        let pos = PDB_HEADER_LEN + index * RECORD_INFO_LEN;
        u32::from_be_bytes([
            self.data[pos],
            self.data[pos + 1],
            self.data[pos + 2],
            self.data[pos + 3],
        ]) as usize
    }

    /// Byte range of record `index`.
    pub fn record_range(&self, index: usize) -> Result<(usize, usize)> {
        let count = self.num_records as usize;
        if index >= count {
            return Err(Error::IndexOutOfRange { index, count });
        }

        let start = self.record_offset(index);
        let end = if index + 1 < count {
            self.record_offset(index + 1)
        } else {
            self.data.len()
        };

        Ok((start, end))
    }

    /// Bytes of record `index`.
    pub fn read_record(&self, index: usize) -> Result<&'a [u8]> {
        self.record(index).map(|r| r.data)
    }

    pub fn record(&self, index: usize) -> Result<Record<'a>> {
        let (start, end) = self.record_range(index)?;
        if start > end || end > self.data.len() {
            return Err(Error::CorruptRecordTable {
                index,
                start,
                end,
                len: self.data.len(),
            });
        }
        Ok(Record {
            index,
            start,
            end,
            data: &self.data[start..end],
        })
    }

    /// Iterate over all records in table order.
    pub fn records(self) -> impl Iterator<Item = Result<Record<'a>>> + 'a {
        (0..self.num_records as usize).map(move |i| self.record(i))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a PDB with the given identifier and records.
    pub(crate) fn build_pdb(ident: &[u8; 8], records: &[&[u8]]) -> Vec<u8> {
        let mut data = vec![0u8; PDB_HEADER_LEN];
        data[..10].copy_from_slice(b"HDTestBook");
        data[IDENT_OFFSET..IDENT_OFFSET + 8].copy_from_slice(ident);
        data[RECORD_COUNT_OFFSET..RECORD_COUNT_OFFSET + 2]
            .copy_from_slice(&(records.len() as u16).to_be_bytes());

        let mut offset = PDB_HEADER_LEN + records.len() * RECORD_INFO_LEN;
        for (i, record) in records.iter().enumerate() {
            data.extend_from_slice(&(offset as u32).to_be_bytes());
            data.extend_from_slice(&(2 * i as u32).to_be_bytes()); // attributes + unique id
            offset += record.len();
        }
        for record in records {
            data.extend_from_slice(record);
        }
        data
    }

    #[test]
    fn test_open_rejects_short_buffer() {
        let data = vec![0u8; 40];
        assert!(matches!(
            Container::open(&data),
            Err(Error::NotAContainer(_))
        ));
    }

    #[test]
    fn test_open_rejects_wrong_ident() {
        let data = build_pdb(b"BOOKMOBI", &[b"CONT"]);
        assert!(matches!(
            Container::open(&data),
            Err(Error::NotAContainer(_))
        ));
    }

    #[test]
    fn test_open_rejects_truncated_table() {
        let mut data = build_pdb(HD_CONTAINER_IDENT, &[]);
        data[RECORD_COUNT_OFFSET + 1] = 4;
        assert!(matches!(
            Container::open(&data),
            Err(Error::Truncated { what: "record table", .. })
        ));
    }

    #[test]
    fn test_record_ranges() {
        let data = build_pdb(HD_CONTAINER_IDENT, &[b"CONTabcd", b"RESC", b"tail!"]);
        let pdb = Container::open(&data).unwrap();

        assert_eq!(pdb.record_count(), 3);
        assert_eq!(pdb.name(), "HDTestBook");

        let (s0, e0) = pdb.record_range(0).unwrap();
        let (s1, e1) = pdb.record_range(1).unwrap();
        let (s2, e2) = pdb.record_range(2).unwrap();
        assert_eq!(s0, PDB_HEADER_LEN + 3 * RECORD_INFO_LEN);
        assert_eq!(e0, s1);
        assert_eq!(e1, s2);
        assert_eq!(e2, data.len());

        assert_eq!(pdb.read_record(0).unwrap(), b"CONTabcd");
        assert_eq!(pdb.read_record(1).unwrap(), b"RESC");
        assert_eq!(pdb.read_record(2).unwrap(), b"tail!");
        // Reads are repeatable
        assert_eq!(pdb.read_record(1).unwrap(), b"RESC");
    }

    #[test]
    fn test_index_out_of_range() {
        let data = build_pdb(HD_CONTAINER_IDENT, &[b"CONT"]);
        let pdb = Container::open(&data).unwrap();
        assert!(matches!(
            pdb.record_range(1),
            Err(Error::IndexOutOfRange { index: 1, count: 1 })
        ));
    }

    #[test]
    fn test_corrupt_offset_is_an_error() {
        let mut data = build_pdb(HD_CONTAINER_IDENT, &[b"CONT", b"RESC"]);
        // Point record 1 past the end of the file
        let pos = PDB_HEADER_LEN + RECORD_INFO_LEN;
        data[pos..pos + 4].copy_from_slice(&0xFFFFu32.to_be_bytes());
        let pdb = Container::open(&data).unwrap();

        assert!(matches!(
            pdb.read_record(0),
            Err(Error::CorruptRecordTable { index: 0, .. })
        ));
        assert!(matches!(
            pdb.read_record(1),
            Err(Error::CorruptRecordTable { index: 1, .. })
        ));
    }

    #[test]
    fn test_records_iterator() {
        let data = build_pdb(HD_CONTAINER_IDENT, &[b"CONT", b"FONTxx", b""]);
        let pdb = Container::open(&data).unwrap();
        let lens: Vec<usize> = pdb.records().map(|r| r.unwrap().data.len()).collect();
        assert_eq!(lens, vec![4, 6, 0]);
    }
}
