//! Integration tests for the compiled-expression cache

use std::sync::Arc;
use std::thread;

use kindle_expr::ExpressionCache;

#[test]
fn concurrent_lookups_compile_each_source_once_in_cache() {
    let cache = Arc::new(ExpressionCache::new(64));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..16 {
                    cache.get_or_compile(&format!("a > {i}")).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    let stats = cache.stats();
    assert_eq!(stats.len, 16);
    assert_eq!(stats.hits + stats.misses, 128);
}

#[test]
fn bounded_cache_never_exceeds_capacity() {
    let cache = ExpressionCache::new(4);
    for i in 0..20 {
        cache.get_or_compile(&format!("x + {i}")).unwrap();
    }
    assert_eq!(cache.len(), 4);
    assert_eq!(cache.stats().evictions, 16);
}

#[test]
fn identical_source_shares_compiled_form() {
    let cache = ExpressionCache::new(4);
    let a = cache.get_or_compile("a + b").unwrap();
    let b = cache.get_or_compile("a + b").unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.hash(), b.hash());
}
