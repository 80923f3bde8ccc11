//! 终端应用 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，持有配置、测验流程和输入表单。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：记录启动信息、打开历史记录目录、创建 LLM 客户端
//! 2. **命令循环**：逐行读取 stdin，按当前界面解析命令
//! 3. **界面切换**：配置 / 答题 / 结果 / 历史记录面板
//! 4. **Ctrl-C**：整个运行期间只监听一次，生成期间取消请求，其余时候退出程序

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, info, warn};

use crate::config::{Config, MAX_QUESTIONS, MIN_QUESTIONS};
use crate::error::{InputError, SessionError};
use crate::models::question::OPTION_COUNT;
use crate::orchestrator::views;
use crate::services::history_store::{FileStore, HistoryStore};
use crate::services::llm_service::LlmService;
use crate::utils::logging::log_startup;
use crate::workflow::input_form::{InputForm, InputMode};
use crate::workflow::quiz_flow::QuizFlow;
use crate::workflow::quiz_session::{GenerationOutcome, QuizState};

/// 当前界面
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Configuring,
    Active,
    Results,
    History,
}

/// 用户命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Topic(String),
    File(PathBuf),
    Mode(InputMode),
    Count(String),
    Generate,
    History,
    /// 选项索引（A → 0）
    Select(usize),
    Next,
    Finish,
    Restart,
    /// 历史记录编号（从 1 开始）
    View(usize),
    Clear,
    Back,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

/// 按界面解析一行输入
///
/// 同一个字母在不同界面含义不同，例如答题界面的 `b` 是选项 B，
/// 历史记录面板的 `b` 是返回
pub fn parse_command(screen: Screen, line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }

    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };
    let head = head.to_lowercase();

    match (head.as_str(), rest) {
        ("quit" | "q" | "exit", "") => return Command::Quit,
        ("help" | "?", "") => return Command::Help,
        _ => {}
    }

    match screen {
        Screen::Configuring => match (head.as_str(), rest) {
            ("topic" | "t", text) => Command::Topic(text.to_string()),
            ("file" | "f", path) if !path.is_empty() => Command::File(PathBuf::from(path)),
            ("mode" | "m", "topic") => Command::Mode(InputMode::Topic),
            ("mode" | "m", "file") => Command::Mode(InputMode::File),
            ("count" | "n", value) if !value.is_empty() => Command::Count(value.to_string()),
            ("go" | "g" | "generate", "") => Command::Generate,
            ("history" | "h", "") => Command::History,
            _ => Command::Unknown(line.to_string()),
        },
        Screen::Active => match (head.as_str(), rest) {
            (letter, "") if letter.len() == 1 => {
                let index = (letter.as_bytes()[0] as usize).wrapping_sub(b'a' as usize);
                match letter {
                    "n" => Command::Next,
                    "f" => Command::Finish,
                    _ if index < OPTION_COUNT => Command::Select(index),
                    _ => Command::Unknown(line.to_string()),
                }
            }
            ("next", "") => Command::Next,
            ("finish", "") => Command::Finish,
            _ => Command::Unknown(line.to_string()),
        },
        Screen::Results => match (head.as_str(), rest) {
            ("restart" | "r" | "new", "") => Command::Restart,
            ("history" | "h", "") => Command::History,
            _ => Command::Unknown(line.to_string()),
        },
        Screen::History => match (head.as_str(), rest) {
            ("view" | "v", value) => value
                .parse()
                .map(Command::View)
                .unwrap_or_else(|_| Command::Unknown(line.to_string())),
            ("clear" | "c", "") => Command::Clear,
            ("back" | "b", "") => Command::Back,
            (number, "") => number
                .parse()
                .map(Command::View)
                .unwrap_or_else(|_| Command::Unknown(line.to_string())),
            _ => Command::Unknown(line.to_string()),
        },
    }
}

/// 清空历史记录需要明确输入 y
pub fn is_confirmed(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
}

/// 解析题目数量输入
pub fn parse_count(value: &str) -> Result<usize, InputError> {
    let out_of_range = |got| InputError::QuestionCountOutOfRange {
        got,
        min: MIN_QUESTIONS,
        max: MAX_QUESTIONS,
    };
    let got = value.trim().parse::<usize>().map_err(|_| out_of_range(0))?;
    if (MIN_QUESTIONS..=MAX_QUESTIONS).contains(&got) {
        Ok(got)
    } else {
        Err(out_of_range(got))
    }
}

/// 等待输入的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Line(String),
    /// 收到 Ctrl-C
    Interrupt,
    /// stdin 已关闭
    Closed,
}

/// 启动 Ctrl-C 监听任务，每次按下都会发送一个通知
pub fn spawn_interrupt_listener() -> UnboundedReceiver<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        loop {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    if tx.send(()).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("无法监听 Ctrl-C: {}", e);
                    break;
                }
            }
        }
    });
    rx
}

/// 等待下一行输入或 Ctrl-C
pub async fn next_input<R>(
    lines: &mut Lines<R>,
    interrupts: &mut UnboundedReceiver<()>,
) -> std::io::Result<Input>
where
    R: AsyncBufRead + Unpin,
{
    tokio::select! {
        line = lines.next_line() => Ok(line?.map_or(Input::Closed, Input::Line)),
        Some(()) = interrupts.recv() => Ok(Input::Interrupt),
    }
}

/// 等待下一次 Ctrl-C；监听任务已退出时永远不会完成
pub async fn wait_for_interrupt(interrupts: &mut UnboundedReceiver<()>) {
    if interrupts.recv().await.is_none() {
        std::future::pending::<()>().await;
    }
}

enum Control {
    Continue,
    Quit,
}

/// 应用主结构
pub struct App {
    config: Config,
    flow: QuizFlow<LlmService, FileStore>,
    form: InputForm,
    /// 历史记录面板是否打开
    history_open: bool,
    /// 一次性提示（非法命令、状态错误等）
    notice: Option<String>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let history = HistoryStore::open(config.history_path());
        let generator = LlmService::new(&config);
        let form = InputForm::new(config.default_question_count);

        let flow = QuizFlow::new(generator, history);
        if !flow.history().is_empty() {
            info!("📚 已加载 {} 条历史记录", flow.history().len());
        }

        Ok(Self {
            flow,
            form,
            config,
            history_open: false,
            notice: None,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut interrupts = spawn_interrupt_listener();

        loop {
            let screen = self.screen();
            self.render(screen)?;

            let line = match next_input(&mut lines, &mut interrupts).await? {
                Input::Line(line) => line,
                Input::Interrupt => {
                    println!();
                    info!("收到 Ctrl-C");
                    break;
                }
                Input::Closed => {
                    debug!("stdin 已关闭");
                    break;
                }
            };

            let command = parse_command(screen, &line);
            match self
                .handle(screen, command, &mut lines, &mut interrupts)
                .await?
            {
                Control::Continue => {}
                Control::Quit => break,
            }
        }

        info!("👋 程序结束");
        Ok(())
    }

    fn screen(&self) -> Screen {
        if self.history_open {
            return Screen::History;
        }
        match self.flow.session().state() {
            QuizState::Active(_) => Screen::Active,
            QuizState::Finished(_) => Screen::Results,
            QuizState::Configuring { .. } | QuizState::Generating { .. } => Screen::Configuring,
        }
    }

    fn render(&mut self, screen: Screen) -> Result<()> {
        let text = match (screen, self.flow.session().state()) {
            (Screen::History, _) => views::render_history(self.flow.history()),
            (Screen::Active, QuizState::Active(active)) => views::render_active(active),
            (Screen::Results, QuizState::Finished(finished)) => views::render_results(finished),
            _ => views::render_configuring(
                &self.form,
                self.flow.session().error(),
                self.flow.history().len(),
            ),
        };

        let mut stdout = std::io::stdout().lock();
        write!(stdout, "{}", text)?;
        if let Some(notice) = self.notice.take() {
            writeln!(stdout, "* {}", notice)?;
        }
        write!(stdout, "> ")?;
        stdout.flush()?;
        Ok(())
    }

    async fn handle(
        &mut self,
        screen: Screen,
        command: Command,
        lines: &mut Lines<BufReader<Stdin>>,
        interrupts: &mut UnboundedReceiver<()>,
    ) -> Result<Control> {
        match command {
            Command::Quit => return Ok(Control::Quit),
            Command::Empty => {}
            Command::Help => self.notice = Some(help_text(screen).to_string()),
            Command::Unknown(input) => {
                self.notice = Some(format!("Unknown command: {} (type help)", input));
            }

            // ========== 配置界面 ==========
            Command::Topic(text) => {
                self.form.set_mode(InputMode::Topic);
                self.form.set_topic(text);
            }
            Command::File(path) => {
                info!("📄 读取文件: {}", path.display());
                self.form.select_file(&path).await;
            }
            Command::Mode(mode) => self.form.set_mode(mode),
            Command::Count(value) => match parse_count(&value) {
                Ok(count) => {
                    self.form.set_num_questions(count);
                }
                Err(e) => self.notice = Some(e.to_string()),
            },
            Command::Generate => self.generate(interrupts).await?,

            // ========== 答题界面 ==========
            Command::Select(index) => {
                if let Err(e) = self.flow.session_mut().select_option(index) {
                    self.notice = Some(e.to_string());
                }
            }
            Command::Next => {
                if let Err(e) = self.flow.session_mut().advance() {
                    self.notice = Some(e.to_string());
                }
            }
            Command::Finish => match self.flow.finish() {
                Ok(entry) => info!("✅ 测验完成: {}/{}", entry.score, entry.total()),
                Err(e) => self.notice = Some(e.to_string()),
            },

            // ========== 结果界面 ==========
            Command::Restart => match self.flow.restart() {
                Ok(()) => self.form = InputForm::new(self.config.default_question_count),
                Err(e) => self.notice = Some(e.to_string()),
            },

            // ========== 历史记录面板 ==========
            Command::History => {
                if self.flow.history().is_empty() {
                    self.notice = Some("No past quizzes found.".to_string());
                } else {
                    self.history_open = true;
                }
            }
            Command::View(number) => {
                let result = match number.checked_sub(1) {
                    Some(index) => self.flow.open_history(index),
                    None => Err(SessionError::HistoryEntryNotFound(number)),
                };
                match result {
                    Ok(()) => self.history_open = false,
                    Err(e) => self.notice = Some(e.to_string()),
                }
            }
            Command::Clear => {
                print!("Clear all quiz history? This cannot be undone. (y/N) ");
                std::io::stdout().flush()?;
                let answer = match next_input(lines, interrupts).await? {
                    Input::Line(answer) => answer,
                    Input::Interrupt | Input::Closed => return Ok(Control::Quit),
                };
                if is_confirmed(&answer) {
                    self.flow.clear_history();
                    self.history_open = false;
                } else {
                    self.notice = Some("History was not cleared.".to_string());
                }
            }
            Command::Back => self.history_open = false,
        }

        Ok(Control::Continue)
    }

    /// 提交表单并等待生成，Ctrl-C 取消
    async fn generate(&mut self, interrupts: &mut UnboundedReceiver<()>) -> Result<()> {
        let (context, count) = match self.form.submit() {
            Ok(input) => input,
            Err(e) => {
                debug!("提交被拒绝: {}", e);
                return Ok(());
            }
        };

        print!("{}", views::render_generating());
        std::io::stdout().flush()?;

        let cancel = wait_for_interrupt(interrupts);
        match self.flow.generate_until(&context, count, cancel).await {
            Ok(GenerationOutcome::Ready { count }) => info!("📝 已生成 {} 道题目", count),
            Ok(GenerationOutcome::Failed { message }) => warn!("生成失败: {}", message),
            Ok(GenerationOutcome::Stale) => debug!("丢弃过期的生成结果"),
            Err(e) => self.notice = Some(e.to_string()),
        }
        Ok(())
    }
}

fn help_text(screen: Screen) -> &'static str {
    match screen {
        Screen::Configuring => {
            "topic <text> sets the topic, file <path> loads a .txt/.docx/.pptx file, \
             count <1-10> sets the number of questions, go generates the quiz"
        }
        Screen::Active => "a-d selects an answer, next moves on, finish ends the quiz",
        Screen::Results => "restart starts a new quiz, history lists past quizzes",
        Screen::History => "view <n> opens a past quiz, clear deletes all history, back returns",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationError;
    use crate::models::question::Question;
    use crate::services::history_store::MemoryStore;
    use crate::services::llm_service::QuizGenerator;
    use futures::future::BoxFuture;
    use tokio::io::AsyncWriteExt;

    /// 永远不会完成的生成器
    struct HangingGenerator;

    impl QuizGenerator for HangingGenerator {
        fn generate<'a>(
            &'a self,
            _context: &'a str,
            _num_questions: usize,
        ) -> BoxFuture<'a, Result<Vec<Question>, GenerationError>> {
            Box::pin(std::future::pending())
        }
    }

    #[tokio::test]
    async fn test_next_input_reads_lines_until_closed() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let mut lines = BufReader::new(reader).lines();
        let (_tx, mut interrupts) = mpsc::unbounded_channel();

        writer.write_all(b"go\n").await.unwrap();
        drop(writer);

        assert_eq!(
            next_input(&mut lines, &mut interrupts).await.unwrap(),
            Input::Line("go".to_string())
        );
        assert_eq!(next_input(&mut lines, &mut interrupts).await.unwrap(), Input::Closed);
    }

    #[tokio::test]
    async fn test_interrupt_after_cancelled_generation_still_quits() {
        let (_writer, reader) = tokio::io::duplex(64);
        let mut lines = BufReader::new(reader).lines();
        let (tx, mut interrupts) = mpsc::unbounded_channel();
        let mut flow = QuizFlow::new(HangingGenerator, HistoryStore::new(MemoryStore::new()));

        // 第一次 Ctrl-C 取消生成
        tx.send(()).unwrap();
        let outcome = flow
            .generate_until("topic", 3, wait_for_interrupt(&mut interrupts))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            GenerationOutcome::Failed {
                message: "Quiz generation was cancelled.".to_string()
            }
        );

        // 第二次 Ctrl-C 在等待输入时被收到
        tx.send(()).unwrap();
        assert_eq!(
            next_input(&mut lines, &mut interrupts).await.unwrap(),
            Input::Interrupt
        );
    }

    #[tokio::test]
    async fn test_closed_listener_never_cancels() {
        let (tx, mut interrupts) = mpsc::unbounded_channel::<()>();
        drop(tx);

        let waited = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            wait_for_interrupt(&mut interrupts),
        )
        .await;
        assert!(waited.is_err());
    }

    #[test]
    fn test_parse_configuring_commands() {
        assert_eq!(
            parse_command(Screen::Configuring, "topic  The Roman Empire "),
            Command::Topic("The Roman Empire".to_string())
        );
        assert_eq!(
            parse_command(Screen::Configuring, "file notes/cell division.pptx"),
            Command::File(PathBuf::from("notes/cell division.pptx"))
        );
        assert_eq!(
            parse_command(Screen::Configuring, "mode file"),
            Command::Mode(InputMode::File)
        );
        assert_eq!(
            parse_command(Screen::Configuring, "count 7"),
            Command::Count("7".to_string())
        );
        assert_eq!(parse_command(Screen::Configuring, "GO"), Command::Generate);
        assert_eq!(parse_command(Screen::Configuring, "  "), Command::Empty);
        assert_eq!(parse_command(Screen::Configuring, "q"), Command::Quit);
    }

    #[test]
    fn test_parse_active_commands() {
        assert_eq!(parse_command(Screen::Active, "a"), Command::Select(0));
        assert_eq!(parse_command(Screen::Active, "D"), Command::Select(3));
        assert_eq!(parse_command(Screen::Active, "n"), Command::Next);
        assert_eq!(parse_command(Screen::Active, "finish"), Command::Finish);
        assert!(matches!(parse_command(Screen::Active, "e"), Command::Unknown(_)));
    }

    #[test]
    fn test_same_letter_depends_on_screen() {
        assert_eq!(parse_command(Screen::Active, "b"), Command::Select(1));
        assert_eq!(parse_command(Screen::History, "b"), Command::Back);
    }

    #[test]
    fn test_parse_history_commands() {
        assert_eq!(parse_command(Screen::History, "view 2"), Command::View(2));
        assert_eq!(parse_command(Screen::History, "3"), Command::View(3));
        assert_eq!(parse_command(Screen::History, "clear"), Command::Clear);
        assert!(matches!(parse_command(Screen::History, "view x"), Command::Unknown(_)));
    }

    #[test]
    fn test_clear_requires_explicit_yes() {
        assert!(is_confirmed("y"));
        assert!(is_confirmed(" YES "));
        assert!(!is_confirmed(""));
        assert!(!is_confirmed("n"));
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("10"), Ok(10));
        assert_eq!(
            parse_count("11"),
            Err(InputError::QuestionCountOutOfRange { got: 11, min: 1, max: 10 })
        );
        assert!(parse_count("five").is_err());
    }
}
