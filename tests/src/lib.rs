#![cfg(test)]

mod mock;
mod scan;
mod verify;
