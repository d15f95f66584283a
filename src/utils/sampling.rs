use rand::seq::SliceRandom;

/// 无放回随机抽取 k 个元素 (k 超过总数时返回全部, 顺序随机)
pub fn sample_without_replacement<T: Clone>(items: &[T], k: usize) -> Vec<T> {
    let mut rng = rand::thread_rng();
    items
        .choose_multiple(&mut rng, k.min(items.len()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn picks_distinct_members() {
        let pool: Vec<u32> = (0..50).collect();
        for _ in 0..20 {
            let picked = sample_without_replacement(&pool, 10);
            assert_eq!(picked.len(), 10);
            let set: HashSet<_> = picked.iter().collect();
            assert_eq!(set.len(), 10);
            assert!(picked.iter().all(|p| pool.contains(p)));
        }
    }

    #[test]
    fn oversized_request_returns_everything() {
        let pool = vec!["a", "b", "c"];
        let mut picked = sample_without_replacement(&pool, 10);
        picked.sort();
        assert_eq!(picked, pool);
        assert!(sample_without_replacement::<u8>(&[], 3).is_empty());
    }
}
