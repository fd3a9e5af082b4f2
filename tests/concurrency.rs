/// Concurrency tests for the string table.
///
/// The stress tests are heavy, and best run one at a time.
///
/// Reminder: to run only concurrency tests, run `cargo test --test concurrency`.
use std::{cmp, collections::HashMap, fmt, sync::Arc, thread};

use bursty::BurstyBuilder;

use endor_string_table::{StringId, Table};

//  Change this variable to use a different number of threads.
const NUMBER_THREADS: usize = 8;

#[test]
fn single_word() {
    //  The simplest stress test: attempt a single first-time insertion, coordinated across all threads.
    //
    //  Each thread misses under the shared lock, then queues for the exclusive lock: the content must be checked again
    //  once the exclusive lock is acquired, or each thread would get its own identifier.

    const MAMA_MIA: &str = "Mama mia!";

    for _ in 0..512 {
        let locals: Vec<Option<StringId>> = vec![None; NUMBER_THREADS];

        let mut builder = BurstyBuilder::new(Arc::new(Table::new().unwrap()), locals);

        builder.add_simple_step(|| {
            |table, local| {
                *local = Some(table.get(MAMA_MIA).id());
            }
        });

        let bursty = builder.launch(1);

        let table = bursty.global();
        let locals: Vec<_> = bursty.into_locals().into_iter().flatten().collect();

        assert_eq!(NUMBER_THREADS, locals.len());
        assert_eq!(Some(MAMA_MIA.as_bytes()), table.resolve(locals[0]));
        assert!(locals.windows(2).all(|window| window[0] == window[1]), "{locals:?}");
        assert_eq!(2, table.len());
    }
}

#[test]
fn words_all_order() {
    //  A more idiomatic test: attempt to insert the same sequence of words, coordinated across all threads.
    //
    //  There are many duplicates, and therefore many insertions should actually turn into simple reads.

    let locals: Vec<Vec<StringId>> = vec![Vec::new(); NUMBER_THREADS];

    let mut builder = BurstyBuilder::new(Arc::new(Table::new().unwrap()), locals);

    let words = corpus::get_words();

    builder.add_simple_step(|| {
        move |table, local| {
            for word in words {
                let handle = table.get(word);

                assert!(!handle.is_null());

                local.push(handle.id());
            }
        }
    });

    let bursty = builder.launch(1);

    let table = bursty.global();
    let locals: Vec<_> = bursty.into_locals();

    //  All threads should have the same result.
    assert_all_identical(&locals);

    let sample = &locals[0];

    //  There should be exactly one StringId per word, and it should retrieve this word.
    assert_word_recovery(&table, words, sample);

    //  There should be exactly one StringId per unique word.
    assert_deduplication(words, sample);

    //  And no more: the empty string, plus the unique words.
    assert_eq!(corpus::get_unique_words().len() + 1, table.len());
}

#[test]
fn unique_all_order() {
    //  A high-contention test: attempt to insert the same sequence of words, guaranteed without duplicate, across all
    //  threads.
    //
    //  The absence of duplicate means that each insertion requires one of the thread to perform it, while the others
    //  queue on the exclusive lock only to find the word already present.

    let locals: Vec<Vec<StringId>> = vec![Vec::new(); NUMBER_THREADS];

    let mut builder = BurstyBuilder::new(Arc::new(Table::new().unwrap()), locals);

    let words = corpus::get_unique_words();

    builder.add_simple_step(|| {
        move |table, local| {
            for word in words {
                local.push(table.get(word).id());
            }
        }
    });

    let bursty = builder.launch(1);

    let table = bursty.global();
    let locals: Vec<_> = bursty.into_locals();

    assert_all_identical(&locals);

    let sample = &locals[0];

    assert_word_recovery(&table, words, sample);
    assert_eq!(words.len() + 1, table.len());
}

#[test]
fn readers_during_growth() {
    //  Handles resolved by readers must remain stable while writers append chunks.

    let mut builder = Table::builder();
    builder.set_chunk_size(64);

    let table = builder.build().unwrap();

    let anchor = table.get("anchor");

    thread::scope(|scope| {
        for t in 0..NUMBER_THREADS / 2 {
            let table = &table;

            scope.spawn(move || {
                for i in 0..2_000 {
                    let word = format!("t{t}-{i}");

                    let handle = table.get(&word);

                    assert_eq!(Some(word.as_bytes()), handle.resolve());
                }
            });
        }

        for _ in 0..NUMBER_THREADS / 2 {
            let table = &table;

            scope.spawn(move || {
                for _ in 0..2_000 {
                    assert_eq!(Some(&b"anchor"[..]), anchor.resolve());
                    assert_eq!(anchor, table.find("anchor"));
                }
            });
        }
    });

    assert_eq!(2 + (NUMBER_THREADS / 2) * 2_000, table.len());
    assert!(table.stats().chunks > 1);
}

#[track_caller]
fn assert_all_identical<T>(elements: &[T])
where
    T: cmp::PartialEq + fmt::Debug,
{
    assert!(elements.windows(2).all(|window| window[0] == window[1]), "{elements:?}");
}

#[track_caller]
fn assert_word_recovery(table: &Table, words: &[String], ids: &[StringId]) {
    assert_eq!(words.len(), ids.len());

    for (index, (word, id)) in words.iter().zip(ids).enumerate() {
        let actual = table.resolve(*id).unwrap();

        assert_eq!(word.as_bytes(), actual, "difference on {index}th word");
    }
}

#[track_caller]
fn assert_deduplication(words: &[String], ids: &[StringId]) {
    let occurrences = {
        let mut occurrences = HashMap::new();

        for (index, word) in words.iter().enumerate() {
            occurrences.entry(word).or_insert(Vec::new()).push(index);
        }

        occurrences
    };

    let mut distinct: Vec<_> = occurrences
        .into_iter()
        .map(|(word, indexes)| {
            let resampled: Vec<_> = indexes.into_iter().map(|index| ids[index]).collect();

            assert!(
                resampled.windows(2).all(|window| window[0] == window[1]),
                "difference in StringIds of {word}: {resampled:?}"
            );

            resampled[0]
        })
        .collect();

    //  Distinct words have distinct identifiers.
    let total = distinct.len();

    distinct.sort();
    distinct.dedup();

    assert_eq!(total, distinct.len());
}

//  A synthetic corpus, in two forms:
//  -   A sequence of words, with many repeats.
//  -   A sequence of _unique_ words, in the same order as above, minus duplicates.
mod corpus {
    use std::{collections::HashSet, sync::OnceLock};

    static WORDS: OnceLock<Vec<String>> = OnceLock::new();

    static UNIQUE: OnceLock<Vec<String>> = OnceLock::new();

    pub(super) fn get_words() -> &'static [String] {
        WORDS.get_or_init(|| {
            //  A cheap LCG, to interleave repeats without pulling a RNG.
            let mut state: u64 = 0x2545_f491_4f6c_dd1d;

            (0..20_000)
                .map(|_| {
                    state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);

                    format!("word{}", (state >> 33) % 1_500)
                })
                .collect()
        })
    }

    pub(super) fn get_unique_words() -> &'static [String] {
        UNIQUE.get_or_init(|| {
            let mut seen = HashSet::new();
            let mut dedup = Vec::new();

            for word in get_words() {
                if seen.insert(word) {
                    dedup.push(word.clone());
                }
            }

            dedup
        })
    }
}
