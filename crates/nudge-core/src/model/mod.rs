mod reminder;

#[cfg(test)]
mod tests;

pub use reminder::*;
