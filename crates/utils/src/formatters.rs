// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

/// Short form of a 32 byte handle or tx hash: `0x1234abcd..9f00`
pub fn short_hex(data: &[u8]) -> String {
    let s = hex_string(data);
    if s.len() <= 12 {
        return format!("0x{}", s);
    }
    format!("0x{}..{}", &s[..8], &s[s.len() - 4..])
}

fn hex_string(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02x}", b)).collect()
}
