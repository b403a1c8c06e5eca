// Prompt construction

/// Instructions for a single-sentence conventional commit message of type `keyword`.
pub fn system_prompt(keyword: &str) -> String {
    format!(
        "You are to act as an author of a commit message in git. \
         You will be given the output of the 'git diff --staged' command, and you are to convert it into a commit message. \
         Craft a concise, single sentence commit message that encapsulates all changes made, with an emphasis on the primary updates. \
         If the modifications share a common theme or scope, mention it succinctly; otherwise, leave the scope out to maintain focus. \
         The goal is to provide a clear and unified overview of the changes in one single message. \
         This is a '{keyword}' commit, preface the commit with the conventional commit type '{keyword}:'."
    )
}

pub fn build_prompt(keyword: &str, diff: &str) -> String {
    format!(
        "{}\nHere is the output of 'git diff --staged': ```\n{diff}\n```",
        system_prompt(keyword)
    )
}
