use rand::Rng;

/// Returns a uniformly random permutation of `0..n` (Fisher-Yates).
pub fn initialize<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<usize> {
    let mut order = collapse(n);
    for i in (1..n).rev() {
        let j = rng.random_range(0..=i);
        order.swap(i, j);
    }
    order
}

pub fn collapse(n: usize) -> Vec<usize> {
    (0..n).collect()
}

pub fn is_permutation(order: &[usize], n: usize) -> bool {
    if order.len() != n {
        return false;
    }
    let mut seen = vec![false; n];
    for &index in order {
        if index >= n || seen[index] {
            return false;
        }
        seen[index] = true;
    }
    true
}

pub fn is_identity(order: &[usize]) -> bool {
    order.iter().enumerate().all(|(slot, &index)| slot == index)
}
