//! Canned hints, from a gentle nudge (level 1) to a full walkthrough (level 5).

/// The most detailed hint level
pub const MAX_HINT_LEVEL: u8 = 5;

const HINTS: [&str; MAX_HINT_LEVEL as usize] = [
    "Start with compute_embedding(word): use model.encode([word])[0] to get \
     the word's vector. It represents the word's meaning, or its letter \
     frequencies when no embedding model is loaded.",
    "For compute_embedding: simply return model.encode([word])[0]. The model \
     does all the work, so every word you embed lives in the same space as \
     the reference answer.",
    "For rank_words_by_similarity: get the target embedding first. Then loop \
     through each word, get its embedding, and compute the cosine similarity \
     with the provided cosine_similarity(emb1, emb2) function.",
    "Store (word, similarity) tuples, then sort by similarity descending: \
     similarities.sort(key=lambda x: x[1], reverse=True). Use \
     enumerate(similarities, start=1) to assign ranks.",
    "Complete solution:\n\n\
     def compute_embedding(word):\n    return model.encode([word])[0]\n\n\
     def rank_words_by_similarity(target, words):\n    \
     target_emb = compute_embedding(target)\n    \
     similarities = []\n    \
     for word in words:\n        \
     sim = cosine_similarity(target_emb, compute_embedding(word))\n        \
     similarities.append((word, sim))\n    \
     similarities.sort(key=lambda x: x[1], reverse=True)\n    \
     return {word: rank for rank, (word, sim) in enumerate(similarities, 1)}",
];

/// Hint text for `level`; anything outside `1..=5` gets the full walkthrough.
pub fn hint(level: u8) -> &'static str {
    let idx = match level {
        1..=MAX_HINT_LEVEL => level - 1,
        _ => MAX_HINT_LEVEL - 1,
    };
    HINTS[idx as usize]
}
