// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! WebAssembly name section handling
//!
//! The name section is a custom section carrying debug names. Only the
//! module name and function names are retained; they show up in trap
//! backtraces.

use std::collections::HashMap;

use kiln_error::Result;

use crate::{module::Names, reader::BinaryReader};

/// Module name subsection
pub const NAME_MODULE: u8 = 0;
/// Function names subsection
pub const NAME_FUNCTION: u8 = 1;
/// Local names subsection
pub const NAME_LOCAL: u8 = 2;

/// Parse the payload of a `name` custom section.
pub fn parse_name_section(mut reader: BinaryReader<'_>) -> Result<Names> {
    let mut names = Names::default();
    while !reader.is_empty() {
        let kind = reader.read_u8()?;
        let size = reader.read_u32()? as usize;
        let mut subsection = reader.sub_reader(size)?;

        match kind {
            NAME_MODULE => {
                names.module = Some(subsection.read_name()?.to_owned());
            },
            NAME_FUNCTION => {
                names.functions = parse_name_map(&mut subsection)?;
            },
            // Local names and unknown subsections are skipped
            _ => continue,
        }
        subsection.finish("name subsection")?;
    }
    Ok(names)
}

/// Parse a vector of (index, name) pairs.
fn parse_name_map(reader: &mut BinaryReader<'_>) -> Result<HashMap<u32, String>> {
    let count = reader.read_count()?;
    let mut map = HashMap::with_capacity(count as usize);
    for _ in 0..count {
        let index = reader.read_u32()?;
        let name = reader.read_name()?;
        map.insert(index, name.to_owned());
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_and_function_names() {
        let data = [
            NAME_MODULE, 4, 3, b'm', b'o', b'd', //
            NAME_FUNCTION, 7, 2, 0, 1, b'a', 3, 1, b'b', //
            NAME_LOCAL, 1, 0,
        ];
        let names = parse_name_section(BinaryReader::new(&data)).unwrap();
        assert_eq!(names.module.as_deref(), Some("mod"));
        assert_eq!(names.functions.get(&0).map(String::as_str), Some("a"));
        assert_eq!(names.functions.get(&3).map(String::as_str), Some("b"));
    }

    #[test]
    fn test_truncated_subsection() {
        let mut data = vec![0u8; 100];
        data.extend_from_slice(&[NAME_FUNCTION, 9, 1, 0]);
        let mut reader = BinaryReader::new(&data);
        reader.read_bytes(100).unwrap();
        let err = parse_name_section(reader).unwrap_err();
        assert_eq!(err.offset(), Some(102));
    }
}
