/// Calculate the SHA-1 hash of one or more byte slices concatenated.
#[macro_export]
macro_rules! sha1 {
    ( $( $x:expr ),+ ) => {{
        use $crate::digest::sha1::{Digest, Sha1};
        let mut h = Sha1::new();
        $( h.update($x); )+
        let out: [u8; 20] = h.finalize().into();
        out
    }};
}

/// Calculate the SHA-256 hash of one or more byte slices concatenated.
#[macro_export]
macro_rules! sha256 {
    ( $( $x:expr ),+ ) => {{
        use $crate::digest::sha2::{Digest, Sha256};
        let mut h = Sha256::new();
        $( h.update($x); )+
        let out: [u8; 32] = h.finalize().into();
        out
    }};
}

/// Calculate the MD5 digest of one or more byte slices concatenated.
#[macro_export]
macro_rules! md5 {
    ( $( $x:expr ),+ ) => {{
        use $crate::digest::md5::{Digest, Md5};
        let mut h = Md5::new();
        $( h.update($x); )+
        let out: [u8; 16] = h.finalize().into();
        out
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn digest_widths() {
        assert_eq!(sha1!(b"abc").len(), 20);
        assert_eq!(sha256!(b"abc").len(), 32);
        assert_eq!(md5!(b"abc").len(), 16);
    }

    #[test]
    fn concatenation_matches_single_buffer() {
        assert_eq!(sha1!(b"ab", b"cd"), sha1!(b"abcd"));
        assert_eq!(sha256!(b"ab", b"cd"), sha256!(b"abcd"));
        assert_eq!(md5!(b"ab", b"cd"), md5!(b"abcd"));
    }
}
