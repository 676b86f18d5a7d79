pub mod confined_path;

#[cfg(test)]
mod tests;
