/// An executable section copied out of the binary, placed at its load address.
pub struct CodeRegion {
    pub start: u64,
    pub bytes: Vec<u8>,
}

impl CodeRegion {
    pub fn new(start: u64, bytes: Vec<u8>) -> Self {
        Self { start, bytes }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr - self.start < self.size()
    }

    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.size())
    }

    /// Bytes from `addr` to the end of the region.
    pub fn bytes_from(&self, addr: u64) -> Option<&[u8]> {
        if !self.contains(addr) {
            return None;
        }
        let offset = usize::try_from(addr - self.start).ok()?;
        self.bytes.get(offset..)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_from_is_bounded_by_the_region() {
        let region = CodeRegion::new(0x1000, vec![0x90, 0x90, 0xc3]);
        assert_eq!(region.end(), 0x1003);
        assert_eq!(region.bytes_from(0x1002), Some(&[0xc3u8][..]));
        assert_eq!(region.bytes_from(0x1003), None);
        assert_eq!(region.bytes_from(0xfff), None);
    }
}
