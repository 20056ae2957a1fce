// Copyright 2026 the transcoder project developers. See the COPYRIGHT
// file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

macro_rules! decode_loop_body {
    ($eof:block,
     $body:block,
     $slf:ident,
     $src:ident,
     $dst:ident,
     $last:ident,
     $b:ident,
     $destination_handle:ident,
     $unread_handle:ident,
     $destination_check:ident) => (
    fn run(&mut $slf,
           $src: &mut ByteSource<'_>,
           $dst: &mut UnitDestination<'_>,
           $last: bool)
           -> CoderResult {
        loop {
            match $src.check_available() {
                Space::Full(_) => {
                    if $last {
                        // Start non-boilerplate
                        $eof
                        // End non-boilerplate
                    }
                    return CoderResult::Underflow;
                }
                Space::Available(source_handle) => {
                    match $dst.$destination_check() {
                        Space::Full(_) => {
                            return CoderResult::Overflow;
                        }
                        Space::Available($destination_handle) => {
                            let ($b, $unread_handle) = source_handle.read();
                            // Start non-boilerplate
                            $body
                            // End non-boilerplate
                        }
                    }
                }
            }
        }
    });
}

macro_rules! encode_loop_body {
    ($eof:block,
     $body:block,
     $slf:ident,
     $src:ident,
     $dst:ident,
     $last:ident,
     $c:ident,
     $destination_handle:ident,
     $unread_handle:ident,
     $destination_check:ident) => (
    fn run(&mut $slf,
           $src: &mut UnitSource<'_>,
           $dst: &mut ByteDestination<'_>,
           $last: bool)
           -> CoderResult {
        loop {
            match $src.check_available() {
                Space::Full(_) => {
                    if $last {
                        // Start non-boilerplate
                        $eof
                        // End non-boilerplate
                    }
                    return CoderResult::Underflow;
                }
                Space::Available(source_handle) => {
                    match $dst.$destination_check() {
                        Space::Full(_) => {
                            return CoderResult::Overflow;
                        }
                        Space::Available($destination_handle) => {
                            let ($c, $unread_handle) = source_handle.read();
                            // Start non-boilerplate
                            $body
                            // End non-boilerplate
                        }
                    }
                }
            }
        }
    });
}
