//! Address-decoded memory bus: dispatches 8-bit reads/writes to registered device handlers.
//!
//! Grounded on `original_source/src/bus.c`'s ordered-linked-list-of-connections design: a
//! flat, ascending-address collection is sufficient because real hardware never registers
//! more than a couple dozen connections at once. Unlike a bus that hardcodes one giant
//! match over a fixed system map, this bus knows nothing about what's behind any given
//! range — every connection is supplied by the caller as a pair of closures, so
//! PPU/APU/cartridge/etc. register themselves as external collaborators.

use crate::error::{BusOverlap, ConnectionNotFound};

type ReadFn = Box<dyn FnMut(u16) -> u8>;
type WriteFn = Box<dyn FnMut(u16, u8)>;

struct Connection {
    start: u16,
    size: u16,
    read: ReadFn,
    write: WriteFn,
}

impl Connection {
    fn contains(&self, address: u16) -> bool {
        let start = u32::from(self.start);
        let end = start + u32::from(self.size);
        (start..end).contains(&u32::from(address))
    }

    fn overlaps(&self, start: u16, size: u16) -> bool {
        let a_start = u32::from(self.start);
        let a_end = a_start + u32::from(self.size);
        let b_start = u32::from(start);
        let b_end = b_start + u32::from(size);
        a_start < b_end && b_start < a_end
    }
}

/// Address-range-indexed dispatch of 8-bit reads/writes. Contains no memory of its own;
/// reads and writes are delegated to whichever connection's range contains the address.
#[derive(Default)]
pub struct Bus {
    connections: Vec<Connection>,
}

impl Bus {
    #[must_use]
    pub fn new() -> Self {
        Self { connections: Vec::new() }
    }

    /// Registers a connection covering `[start, start + size)`. Connections are kept in
    /// ascending-address order; a range that overlaps any existing connection is rejected
    /// and the bus is left unchanged.
    pub fn add_connection(
        &mut self,
        start: u16,
        size: u16,
        read: impl FnMut(u16) -> u8 + 'static,
        write: impl FnMut(u16, u8) + 'static,
    ) -> Result<(), BusOverlap> {
        if self.connections.iter().any(|c| c.overlaps(start, size)) {
            return Err(BusOverlap { start, size });
        }

        let insert_at =
            self.connections.partition_point(|c| c.start < start);
        self.connections.insert(
            insert_at,
            Connection { start, size, read: Box::new(read), write: Box::new(write) },
        );

        let end = u32::from(start) + u32::from(size);
        log::trace!("Bus connection registered: [{start:#06X}, {end:#06X})");

        Ok(())
    }

    /// Removes the connection starting exactly at `start`.
    pub fn remove_connection(&mut self, start: u16) -> Result<(), ConnectionNotFound> {
        let index = self.connections.iter().position(|c| c.start == start);
        match index {
            Some(index) => {
                self.connections.remove(index);
                Ok(())
            }
            None => Err(ConnectionNotFound { start }),
        }
    }

    fn find_mut(&mut self, address: u16) -> Option<&mut Connection> {
        self.connections.iter_mut().find(|c| c.contains(address))
    }

    /// Reads one byte. Returns `None` if no connection covers `address`.
    #[must_use]
    pub fn read(&mut self, address: u16) -> Option<u8> {
        let connection = self.find_mut(address)?;
        let offset = address - connection.start;
        Some((connection.read)(offset))
    }

    /// Writes one byte. Returns `false` if no connection covers `address`.
    #[must_use]
    pub fn write(&mut self, address: u16, value: u8) -> bool {
        let Some(connection) = self.find_mut(address) else {
            return false;
        };
        let offset = address - connection.start;
        (connection.write)(offset, value);
        true
    }

    /// Reads a little-endian 16-bit word: low byte at `address`, high byte at
    /// `address + 1`. Fails (returns `None`) if either sub-read fails.
    #[must_use]
    pub fn read_u16(&mut self, address: u16) -> Option<u16> {
        let lo = self.read(address)?;
        let hi = self.read(address.wrapping_add(1))?;
        Some(u16::from_le_bytes([lo, hi]))
    }

    /// Writes a little-endian 16-bit word. Fails (returns `false`) if either sub-write
    /// fails; a partial write may still have occurred on the low byte.
    #[must_use]
    pub fn write_u16(&mut self, address: u16, value: u16) -> bool {
        let [lo, hi] = value.to_le_bytes();
        let low_ok = self.write(address, lo);
        let high_ok = self.write(address.wrapping_add(1), hi);
        low_ok && high_ok
    }
}
