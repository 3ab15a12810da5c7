use crate::error::RuntimeError;
use crate::specs::{DATA_START, MAX_DATA_MEM, MAX_STACK, STACK_START};

/// Guest memory of one invocation: host-supplied context bytes mapped at
/// `DATA_START` and a fixed stack mapped at `STACK_START`. All accesses are
/// little-endian.
#[derive(Debug, Clone)]
pub struct Memory {
    data: Vec<u8>,
    stack: Box<[u8; MAX_STACK]>,
}

impl Memory {
    pub fn new(context: Vec<u8>) -> Result<Self, RuntimeError> {
        if context.len() > MAX_DATA_MEM {
            return Err(RuntimeError::ContextTooLarge {
                got: context.len(),
                max: MAX_DATA_MEM,
            });
        }
        Ok(Self {
            data: context,
            stack: Box::new([0; MAX_STACK]),
        })
    }

    /// Initial value of R10
    pub fn frame_pointer() -> u64 {
        STACK_START + MAX_STACK as u64
    }

    pub fn context(&self) -> &[u8] {
        &self.data
    }

    fn region(&mut self, addr: u64, len: usize) -> Result<&mut [u8], RuntimeError> {
        let oob = RuntimeError::OutOfBounds { addr, len };
        let end = addr.checked_add(len as u64).ok_or(oob.clone())?;

        if addr >= DATA_START && end <= DATA_START + self.data.len() as u64 {
            let start = (addr - DATA_START) as usize;
            return Ok(&mut self.data[start..start + len]);
        }
        if addr >= STACK_START && end <= STACK_START + MAX_STACK as u64 {
            let start = (addr - STACK_START) as usize;
            return Ok(&mut self.stack[start..start + len]);
        }
        Err(oob)
    }

    pub fn load(&mut self, addr: u64, len: usize) -> Result<u64, RuntimeError> {
        let bytes = self.region(addr, len)?;
        let mut buf = [0u8; 8];
        buf[..len].copy_from_slice(bytes);
        Ok(u64::from_le_bytes(buf))
    }

    /// Big-endian read of `len` bytes at `offset` into the context region.
    /// Only the context is reachable this way, never the stack.
    pub fn load_context_be(&self, offset: u64, len: usize) -> Result<u64, RuntimeError> {
        let oob = RuntimeError::OutOfBounds {
            addr: DATA_START.wrapping_add(offset),
            len,
        };
        let end = offset.checked_add(len as u64).ok_or(oob.clone())?;
        if end > self.data.len() as u64 {
            return Err(oob);
        }
        let start = offset as usize;
        let value = self.data[start..start + len]
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | b as u64);
        Ok(value)
    }

    pub fn store(&mut self, addr: u64, len: usize, val: u64) -> Result<(), RuntimeError> {
        let bytes = self.region(addr, len)?;
        bytes.copy_from_slice(&val.to_le_bytes()[..len]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_round_trip() {
        let mut mem = Memory::new(Vec::new()).unwrap();
        let fp = Memory::frame_pointer();
        mem.store(fp - 8, 8, 0x1122_3344_5566_7788).unwrap();
        assert_eq!(mem.load(fp - 8, 8).unwrap(), 0x1122_3344_5566_7788);
        assert_eq!(mem.load(fp - 8, 1).unwrap(), 0x88);
        assert_eq!(mem.load(fp - 4, 4).unwrap(), 0x1122_3344);
    }

    #[test]
    fn test_out_of_bounds() {
        let mut mem = Memory::new(vec![1, 2, 3, 4]).unwrap();
        let fp = Memory::frame_pointer();
        assert!(matches!(mem.load(fp, 1), Err(RuntimeError::OutOfBounds { .. })));
        assert!(matches!(mem.load(fp - 4, 8), Err(RuntimeError::OutOfBounds { .. })));
        assert!(matches!(mem.load(DATA_START + 2, 4), Err(RuntimeError::OutOfBounds { .. })));
        assert!(matches!(mem.load(0, 1), Err(RuntimeError::OutOfBounds { .. })));
        assert!(matches!(mem.load(u64::MAX, 2), Err(RuntimeError::OutOfBounds { .. })));
        assert_eq!(mem.load(DATA_START, 4).unwrap(), 0x0403_0201);
    }

    #[test]
    fn test_context_big_endian_reads() {
        let mem = Memory::new(vec![0x12, 0x34, 0x56, 0x78]).unwrap();
        assert_eq!(mem.load_context_be(0, 4).unwrap(), 0x1234_5678);
        assert_eq!(mem.load_context_be(1, 2).unwrap(), 0x3456);
        assert_eq!(mem.load_context_be(3, 1).unwrap(), 0x78);
        assert!(matches!(
            mem.load_context_be(2, 4),
            Err(RuntimeError::OutOfBounds { addr, len: 4 }) if addr == DATA_START + 2
        ));
        assert!(matches!(
            mem.load_context_be(u64::MAX, 1),
            Err(RuntimeError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_context_limit() {
        assert!(matches!(
            Memory::new(vec![0; MAX_DATA_MEM + 1]),
            Err(RuntimeError::ContextTooLarge { .. })
        ));
    }
}
