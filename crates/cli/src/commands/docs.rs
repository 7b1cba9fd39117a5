//! `gitbuddy docs`: The documentation behind the answers.

/// (title, link, credit)
pub const CORPUS: &[(&str, &str, &str)] = &[
    (
        "Pro Git",
        "https://git-scm.com/book/en/v2",
        "by Scott Chacon and Ben Straub",
    ),
    (
        "GitHub Docs",
        "https://docs.github.com/en",
        "The Official GitHub Documentation",
    ),
    (
        "TortoiseGit Manual",
        "https://tortoisegit.org/docs/tortoisegit/",
        "by Lubbe Onken, Simon Large, Frank Li, and Sven Strickroth",
    ),
    (
        "TortoiseGitMerge Manual",
        "https://tortoisegit.org/docs/tortoisegitmerge/",
        "by Stefan Küng, Lubbe Onken, Simon Large, and Sven Strickroth",
    ),
];

pub fn run() {
    println!("Git Buddy can access documentation from the following sources stored in a Pinecone vector database:");
    println!();
    for (title, link, credit) in CORPUS {
        println!("  {title} ({link})");
        println!("    {credit}");
        println!();
    }
}
