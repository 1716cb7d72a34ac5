#[cfg(test)]
mod quiz_engine;
