//! Hardware model names

/// Model name for a device type code, `"UNKNOWN"` for unlisted codes
pub fn model_name(device_type: i64) -> &'static str {
    match device_type {
        1 | 8 | 16 | 24 => "8B",
        2 | 9 | 17 | 25 => "6B",
        3 | 13 | 18 | 26 => "PT",
        4 | 11 | 19 | 27 => "2B",
        5 | 10 | 20 | 28 => "4B",
        6 | 15 | 21 | 29 => "2R",
        7 | 14 | 23 | 30 => "SOCKET",
        12 | 22 => "IR",
        31 => "PIMA",
        160 => "C4",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_names() {
        assert_eq!(model_name(1), "8B");
        assert_eq!(model_name(25), "6B");
        assert_eq!(model_name(13), "PT");
        assert_eq!(model_name(11), "2B");
        assert_eq!(model_name(28), "4B");
        assert_eq!(model_name(15), "2R");
        assert_eq!(model_name(23), "SOCKET");
        assert_eq!(model_name(22), "IR");
        assert_eq!(model_name(31), "PIMA");
        assert_eq!(model_name(160), "C4");
    }

    #[test]
    fn test_unlisted_codes() {
        assert_eq!(model_name(0), "UNKNOWN");
        assert_eq!(model_name(32), "UNKNOWN");
        assert_eq!(model_name(-1), "UNKNOWN");
    }
}
