// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
#[allow(dead_code)]
pub fn generate_annotated_text(paragraphs: usize) -> String {
    let base = "他{{П}}昨天{{2,Об}}去{{Ск,Гл}}北京{{2,Д,Cущ}}了。我们{{2,П,Мст}}一起{{2,Нар}}学习{{2,Гл}}中文。";
    vec![base; paragraphs].join("\n")
}

#[allow(dead_code)]
pub fn generate_plain_text(paragraphs: usize) -> String {
    vec!["他昨天去北京了。我们一起学习中文。"; paragraphs].join("\n")
}
