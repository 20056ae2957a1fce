// Copyright 2026 the transcoder project developers. See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Cursor types that couple space-availability checking with slice
//! reading/writing.
//!
//! A conversion loop asks the source whether a unit is available and the
//! destination whether there is room *before* touching either; the handle
//! returned by a successful check is consumed by the read or write, so a
//! loop cannot read or write without having checked. The `unread` handle
//! rewinds the source by one unit, which is how a loop leaves an offending
//! unit unconsumed when it reports an error.

/// Outcome of an availability or space check.
pub enum Space<T> {
    /// There is room; the wrapped handle performs the access.
    Available(T),
    /// No room; the wrapped count is the consumed/written total so far.
    Full(usize),
}

// Sources

/// A read cursor over an input slice.
pub struct Source<'a, T> {
    slice: &'a [T],
    pos: usize,
}

impl<'a, T: Copy> Source<'a, T> {
    #[inline(always)]
    pub fn new(src: &'a [T]) -> Source<'a, T> {
        Source {
            slice: src,
            pos: 0,
        }
    }
    #[inline(always)]
    pub fn check_available<'b>(&'b mut self) -> Space<ReadHandle<'b, 'a, T>> {
        if self.pos < self.slice.len() {
            Space::Available(ReadHandle::new(self))
        } else {
            Space::Full(self.consumed())
        }
    }
    #[inline(always)]
    fn read(&mut self) -> T {
        let ret = self.slice[self.pos];
        self.pos += 1;
        ret
    }
    #[inline(always)]
    fn unread(&mut self) -> usize {
        self.pos -= 1;
        self.pos
    }
    #[inline(always)]
    pub fn consumed(&self) -> usize {
        self.pos
    }
    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.slice.len() - self.pos
    }
    #[inline(always)]
    pub(crate) fn skip(&mut self, n: usize) {
        debug_assert!(n <= self.remaining());
        self.pos += n;
    }
}

pub struct ReadHandle<'a, 'b, T>
    where 'b: 'a
{
    source: &'a mut Source<'b, T>,
}

impl<'a, 'b, T: Copy> ReadHandle<'a, 'b, T>
    where 'b: 'a
{
    #[inline(always)]
    fn new(src: &'a mut Source<'b, T>) -> ReadHandle<'a, 'b, T> {
        ReadHandle { source: src }
    }
    #[inline(always)]
    pub fn read(self) -> (T, UnreadHandle<'a, 'b, T>) {
        let unit = self.source.read();
        let handle = UnreadHandle::new(self.source);
        (unit, handle)
    }
    #[inline(always)]
    pub fn consumed(&self) -> usize {
        self.source.consumed()
    }
}

pub struct UnreadHandle<'a, 'b, T>
    where 'b: 'a
{
    source: &'a mut Source<'b, T>,
}

impl<'a, 'b, T: Copy> UnreadHandle<'a, 'b, T>
    where 'b: 'a
{
    #[inline(always)]
    fn new(src: &'a mut Source<'b, T>) -> UnreadHandle<'a, 'b, T> {
        UnreadHandle { source: src }
    }
    #[inline(always)]
    pub fn unread(self) -> usize {
        self.source.unread()
    }
    #[inline(always)]
    pub fn consumed(&self) -> usize {
        self.source.consumed()
    }
}

// Destinations

/// A write cursor over an output slice.
pub struct Destination<'a, T> {
    slice: &'a mut [T],
    pos: usize,
}

impl<'a, T: Copy> Destination<'a, T> {
    #[inline(always)]
    pub fn new(dst: &'a mut [T]) -> Destination<'a, T> {
        Destination {
            slice: dst,
            pos: 0,
        }
    }
    #[inline(always)]
    pub fn check_space_one<'b>(&'b mut self) -> Space<WriteOneHandle<'b, 'a, T>> {
        if self.pos < self.slice.len() {
            Space::Available(WriteOneHandle::new(self))
        } else {
            Space::Full(self.written())
        }
    }
    #[inline(always)]
    pub fn check_space_two<'b>(&'b mut self) -> Space<WriteTwoHandle<'b, 'a, T>> {
        if self.pos + 1 < self.slice.len() {
            Space::Available(WriteTwoHandle::new(self))
        } else {
            Space::Full(self.written())
        }
    }
    #[inline(always)]
    fn write(&mut self, unit: T) {
        self.slice[self.pos] = unit;
        self.pos += 1;
    }
    #[inline(always)]
    pub fn written(&self) -> usize {
        self.pos
    }
    #[inline(always)]
    pub fn remaining(&self) -> usize {
        self.slice.len() - self.pos
    }
    #[inline(always)]
    pub(crate) fn write_slice(&mut self, units: &[T]) {
        let end = self.pos + units.len();
        self.slice[self.pos..end].copy_from_slice(units);
        self.pos = end;
    }
}

pub struct WriteOneHandle<'a, 'b, T>
    where 'b: 'a
{
    dest: &'a mut Destination<'b, T>,
}

impl<'a, 'b, T: Copy> WriteOneHandle<'a, 'b, T>
    where 'b: 'a
{
    #[inline(always)]
    fn new(dst: &'a mut Destination<'b, T>) -> WriteOneHandle<'a, 'b, T> {
        WriteOneHandle { dest: dst }
    }
    #[inline(always)]
    pub fn write_one(self, unit: T) {
        self.dest.write(unit);
    }
    #[inline(always)]
    pub fn written(&self) -> usize {
        self.dest.written()
    }
}

pub struct WriteTwoHandle<'a, 'b, T>
    where 'b: 'a
{
    dest: &'a mut Destination<'b, T>,
}

impl<'a, 'b, T: Copy> WriteTwoHandle<'a, 'b, T>
    where 'b: 'a
{
    #[inline(always)]
    fn new(dst: &'a mut Destination<'b, T>) -> WriteTwoHandle<'a, 'b, T> {
        WriteTwoHandle { dest: dst }
    }
    #[inline(always)]
    pub fn write_one(self, unit: T) {
        self.dest.write(unit);
    }
    #[inline(always)]
    pub fn write_two(self, first: T, second: T) {
        self.dest.write(first);
        self.dest.write(second);
    }
    #[inline(always)]
    pub fn written(&self) -> usize {
        self.dest.written()
    }
}

/// Decoder-input cursor.
pub type ByteSource<'a> = Source<'a, u8>;
/// Encoder-input cursor.
pub type UnitSource<'a> = Source<'a, u16>;
/// Encoder-output cursor.
pub type ByteDestination<'a> = Destination<'a, u8>;
/// Decoder-output cursor.
pub type UnitDestination<'a> = Destination<'a, u16>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_read_unread() {
        let mut source = ByteSource::new(b"ab");
        match source.check_available() {
            Space::Available(handle) => {
                let (b, unread_handle) = handle.read();
                assert_eq!(b, b'a');
                assert_eq!(unread_handle.consumed(), 1);
                assert_eq!(unread_handle.unread(), 0);
            }
            Space::Full(_) => unreachable!(),
        }
        assert_eq!(source.consumed(), 0);
        assert_eq!(source.remaining(), 2);
    }

    #[test]
    fn test_destination_space_checks() {
        let mut buf = [0u16; 1];
        let mut dest = UnitDestination::new(&mut buf);
        match dest.check_space_two() {
            Space::Full(written) => assert_eq!(written, 0),
            Space::Available(_) => unreachable!(),
        }
        match dest.check_space_one() {
            Space::Available(handle) => handle.write_one(7),
            Space::Full(_) => unreachable!(),
        }
        assert_eq!(dest.written(), 1);
        match dest.check_space_one() {
            Space::Full(written) => assert_eq!(written, 1),
            Space::Available(_) => unreachable!(),
        }
    }
}
