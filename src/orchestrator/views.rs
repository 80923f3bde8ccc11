//! 终端界面渲染
//!
//! 每个生命周期状态对应一个互斥的界面，全部是纯函数，返回要打印的文本

use std::fmt::Write;

use crate::models::history::HistoryEntry;
use crate::utils::truncate_text;
use crate::workflow::input_form::{InputForm, InputMode};
use crate::workflow::quiz_session::{ActiveQuiz, FinishedQuiz};

/// 进度条宽度
const PROGRESS_WIDTH: usize = 30;

/// 历史记录列表中主题的最大显示长度
const TOPIC_PREVIEW_LEN: usize = 60;

/// 选项字母（0 → A）
pub fn option_letter(index: usize) -> char {
    (b'A' + index as u8) as char
}

/// 进度条，`fraction` 取值 0.0..=1.0
pub fn progress_bar(fraction: f64, width: usize) -> String {
    let fraction = fraction.clamp(0.0, 1.0);
    let filled = (fraction * width as f64).round() as usize;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        "-".repeat(width - filled),
        (fraction * 100.0).round() as u32
    )
}

/// 配置界面
pub fn render_configuring(form: &InputForm, banner: Option<&str>, history_count: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n{}", "=".repeat(60));
    let _ = writeln!(out, "AI MCQ Generator");
    let _ = writeln!(out, "Create quizzes instantly from any topic or text file.");
    let _ = writeln!(out, "{}", "=".repeat(60));

    if let Some(message) = banner {
        let _ = writeln!(out, "Error: {}", message);
    }

    match form.mode() {
        InputMode::Topic => {
            let topic = if form.topic().is_empty() {
                "(empty)".to_string()
            } else {
                truncate_text(form.topic(), TOPIC_PREVIEW_LEN)
            };
            let _ = writeln!(out, "Mode: [Enter Topic]  Upload File");
            let _ = writeln!(out, "Topic / Context: {}", topic);
        }
        InputMode::File => {
            let _ = writeln!(out, "Mode: Enter Topic  [Upload File]");
            let _ = writeln!(
                out,
                "Study material (.txt, .docx, .pptx): {}",
                form.file_name().unwrap_or("(no file selected)")
            );
        }
    }
    let _ = writeln!(out, "Number of Questions: {}", form.num_questions());

    if let Some(error) = form.error() {
        let _ = writeln!(out, "! {}", error);
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Commands: topic <text> | file <path> | mode topic|file | count <1-10>");
    if form.can_submit() {
        let _ = write!(out, "          go (Generate Quiz)");
    } else {
        let _ = write!(out, "          go (disabled: no content)");
    }
    if history_count > 0 {
        let _ = write!(out, " | history ({})", history_count);
    }
    let _ = writeln!(out, " | quit");
    out
}

/// 生成中界面
pub fn render_generating() -> String {
    "Generating your quiz, please wait... (Ctrl-C to cancel)\n".to_string()
}

/// 答题界面
pub fn render_active(active: &ActiveQuiz) -> String {
    let tracker = active.tracker();
    let question = active.current_question();
    let mut out = String::new();

    let _ = writeln!(
        out,
        "\nQuestion {} of {}",
        tracker.current_index() + 1,
        tracker.count()
    );
    let _ = writeln!(out, "{}", progress_bar(tracker.progress(), PROGRESS_WIDTH));
    let _ = writeln!(out, "\n{}\n", question.question());

    for (i, option) in question.options().iter().enumerate() {
        let marker = if tracker.selected() == Some(option.as_str()) {
            ">"
        } else {
            " "
        };
        let _ = writeln!(out, "{} {}) {}", marker, option_letter(i), option);
    }

    let _ = writeln!(out);
    if tracker.is_last() {
        let _ = writeln!(out, "Commands: a-d (select) | finish (Finish Quiz) | quit");
    } else {
        let _ = writeln!(out, "Commands: a-d (select) | next | quit");
    }
    out
}

/// 结果界面
pub fn render_results(finished: &FinishedQuiz) -> String {
    let mut out = String::new();
    let total = finished.questions.len();

    let _ = writeln!(out, "\n{}", "=".repeat(60));
    let _ = writeln!(out, "Quiz Results");
    let _ = writeln!(out, "You scored {} / {}", finished.score, total);
    let _ = writeln!(out, "{}%", finished.percentage());
    let _ = writeln!(out, "{}", "=".repeat(60));

    for (index, mcq) in finished.questions.iter().enumerate() {
        let user_answer = finished.answers.get(index).and_then(|a| a.as_deref());
        let is_correct = mcq.is_correct(user_answer);

        let _ = writeln!(out, "\n{}. {}", index + 1, mcq.question());
        for option in mcq.options() {
            let mut indicator = ' ';
            if option == mcq.correct_answer() {
                indicator = '✔';
            }
            if Some(option.as_str()) == user_answer && !is_correct {
                indicator = '✖';
            }
            let picked = if Some(option.as_str()) == user_answer {
                "  (your answer)"
            } else {
                ""
            };
            let _ = writeln!(out, "  {} {}{}", indicator, option, picked);
        }
        if user_answer.is_none() {
            let _ = writeln!(out, "  (not answered)");
        }
    }

    let _ = writeln!(out, "\nCommands: restart (New Quiz) | history | quit");
    out
}

/// 历史记录面板
pub fn render_history(entries: &[HistoryEntry]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n{}", "=".repeat(60));
    let _ = writeln!(out, "Quiz History");
    let _ = writeln!(out, "{}", "=".repeat(60));

    if entries.is_empty() {
        let _ = writeln!(out, "No past quizzes found.");
        let _ = writeln!(out, "\nCommands: back");
        return out;
    }

    for (i, entry) in entries.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>2}. {}",
            i + 1,
            truncate_text(&entry.context_topic, TOPIC_PREVIEW_LEN)
        );
        let _ = writeln!(
            out,
            "    {} • Score: {}/{}",
            entry.date,
            entry.score,
            entry.total()
        );
    }

    let _ = writeln!(out, "\nCommands: view <n> (View Results) | clear | back");
    out
}
