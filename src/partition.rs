use rand::Rng;

/// Picks the partition this process publishes to for its whole lifetime.
///
/// The range is inclusive of `partition_count`, so a topic with 10 partitions
/// can yield index 10.
pub fn select(partition_count: u32) -> u32 {
    select_with(&mut rand::rng(), partition_count)
}

pub fn select_with<R: Rng + ?Sized>(rng: &mut R, partition_count: u32) -> u32 {
    rng.random_range(0..=partition_count)
}
