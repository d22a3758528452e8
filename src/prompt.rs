//! 交互式问卷模块：
//! - `Question` 为声明式的问题描述（默认值、类型、可见性与校验谓词）
//! - `collect` 依次提问，跳过不可见的问题，校验失败则重问
//! - `LinePrompter` 基于任意 `BufRead`/`Write` 渲染问题；终端下密码输入以 `*` 回显

use std::io::{self, BufRead, IsTerminal, Write};

use serde_json::{Map, Value};

/// 已收集的答案（key -> 字符串值）
pub(crate) type Answers = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Choice {
    pub(crate) label: &'static str,
    pub(crate) value: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum QuestionKind {
    Text,
    Secret,
    Select(&'static [Choice]),
}

#[derive(Clone, Copy)]
pub(crate) struct Question {
    pub(crate) key: &'static str,
    pub(crate) message: &'static str,
    pub(crate) default: Option<&'static str>,
    pub(crate) kind: QuestionKind,
    /// 返回 false 时整题跳过，答案中不出现该 key
    pub(crate) when: Option<fn(&Answers) -> bool>,
    pub(crate) validate: Option<fn(&str) -> Result<(), &'static str>>,
}

impl Question {
    pub(crate) const fn text(key: &'static str, message: &'static str) -> Self {
        Self { key, message, default: None, kind: QuestionKind::Text, when: None, validate: None }
    }

    pub(crate) const fn secret(key: &'static str, message: &'static str) -> Self {
        Self { kind: QuestionKind::Secret, ..Self::text(key, message) }
    }

    pub(crate) const fn select(key: &'static str, message: &'static str, choices: &'static [Choice]) -> Self {
        Self { kind: QuestionKind::Select(choices), ..Self::text(key, message) }
    }

    pub(crate) const fn default_value(self, default: &'static str) -> Self {
        Self { default: Some(default), ..self }
    }

    pub(crate) const fn when(self, pred: fn(&Answers) -> bool) -> Self {
        Self { when: Some(pred), ..self }
    }

    pub(crate) const fn validate(self, check: fn(&str) -> Result<(), &'static str>) -> Self {
        Self { validate: Some(check), ..self }
    }

    fn is_visible(&self, answers: &Answers) -> bool {
        self.when.map_or(true, |pred| pred(answers))
    }
}

/// 问题的渲染端；`None` 表示输入已结束（EOF）
pub(crate) trait Prompter {
    fn input(&mut self, message: &str, default: Option<&str>) -> io::Result<Option<String>>;
    fn secret(&mut self, message: &str) -> io::Result<Option<String>>;
    fn select(&mut self, message: &str, choices: &[Choice]) -> io::Result<Option<String>>;
    fn warn(&mut self, message: &str) -> io::Result<()>;
}

/// 依次提问并收集答案
pub(crate) fn collect(questions: &[Question], prompter: &mut dyn Prompter) -> io::Result<Answers> {
    let mut answers = Answers::new();
    for q in questions {
        if !q.is_visible(&answers) {
            tracing::debug!(key = q.key, "question skipped");
            continue;
        }
        let value = ask_until_valid(q, prompter)?;
        answers.insert(q.key.to_string(), Value::String(value));
    }
    Ok(answers)
}

fn ask_until_valid(q: &Question, prompter: &mut dyn Prompter) -> io::Result<String> {
    loop {
        let raw = match q.kind {
            QuestionKind::Text => prompter.input(q.message, q.default)?,
            QuestionKind::Secret => prompter.secret(q.message)?,
            QuestionKind::Select(choices) => {
                match prompter.select(q.message, choices)? {
                    Some(picked) => match resolve_choice(&picked, choices) {
                        Some(value) => Some(value.to_string()),
                        None => {
                            prompter.warn(&format!("请输入 1 到 {} 之间的序号", choices.len()))?;
                            continue;
                        }
                    },
                    None => None,
                }
            }
        };
        let Some(raw) = raw else {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, format!("未回答: {}", q.key)));
        };
        let value = match (raw.is_empty(), q.default) {
            (true, Some(d)) => d.to_string(),
            _ => raw,
        };
        match q.validate.map_or(Ok(()), |check| check(&value)) {
            Ok(()) => return Ok(value),
            Err(msg) => prompter.warn(msg)?,
        }
    }
}

/// 序号（从 1 开始）或选项文本（忽略大小写）
fn resolve_choice(input: &str, choices: &[Choice]) -> Option<&'static str> {
    let t = input.trim();
    if let Ok(idx) = t.parse::<usize>() {
        return idx.checked_sub(1).and_then(|i| choices.get(i)).map(|c| c.value);
    }
    choices
        .iter()
        .find(|c| c.value.eq_ignore_ascii_case(t) || c.label.eq_ignore_ascii_case(t))
        .map(|c| c.value)
}

/// 必填校验
pub(crate) fn non_empty(input: &str) -> Result<(), &'static str> {
    if input.trim().is_empty() { Err("该项不能为空") } else { Ok(()) }
}

/// 行式渲染：每个问题一行提示，读取一行答案
pub(crate) struct LinePrompter<R: BufRead, W: Write> {
    reader: R,
    writer: W,
    mask_secrets: bool,
}

impl<R: BufRead, W: Write> LinePrompter<R, W> {
    pub(crate) fn new(reader: R, writer: W) -> Self {
        Self { reader, writer, mask_secrets: false }
    }

    /// 普通回答去掉首尾空白；密码只去掉行尾换行
    fn read_line(&mut self, keep_spaces: bool) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let value = if keep_spaces { line.trim_end_matches(['\r', '\n']) } else { line.trim() };
        Ok(Some(value.to_string()))
    }
}

impl LinePrompter<io::StdinLock<'static>, io::Stdout> {
    /// 标准输入输出；stdin 为终端时密码以 `*` 回显
    pub(crate) fn stdio() -> Self {
        let stdin = io::stdin();
        let mask_secrets = stdin.is_terminal();
        Self { mask_secrets, ..Self::new(stdin.lock(), io::stdout()) }
    }
}

impl<R: BufRead, W: Write> Prompter for LinePrompter<R, W> {
    fn input(&mut self, message: &str, default: Option<&str>) -> io::Result<Option<String>> {
        match default {
            Some(d) => write!(self.writer, "? {} ({}) ", message, d)?,
            None => write!(self.writer, "? {} ", message)?,
        }
        self.writer.flush()?;
        self.read_line(false)
    }

    fn secret(&mut self, message: &str) -> io::Result<Option<String>> {
        write!(self.writer, "? {} ", message)?;
        self.writer.flush()?;
        if self.mask_secrets {
            let value = read_masked(&mut self.writer)?;
            writeln!(self.writer)?;
            return Ok(value);
        }
        self.read_line(true)
    }

    fn select(&mut self, message: &str, choices: &[Choice]) -> io::Result<Option<String>> {
        writeln!(self.writer, "? {}", message)?;
        for (i, c) in choices.iter().enumerate() {
            writeln!(self.writer, "  {}) {}", i + 1, c.label)?;
        }
        write!(self.writer, "  请选择 [1-{}]: ", choices.len())?;
        self.writer.flush()?;
        self.read_line(false)
    }

    fn warn(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.writer, ">> {}", message)
    }
}

// 原始模式下逐键读取，回显 `*`
fn read_masked(out: &mut impl Write) -> io::Result<Option<String>> {
    use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
    use crossterm::terminal;

    let mut read_keys = || -> io::Result<Option<String>> {
        let mut buf = String::new();
        loop {
            let Event::Key(key) = event::read()? else { continue };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Enter => return Ok(Some(buf)),
                KeyCode::Char('c') | KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Ok(None);
                }
                KeyCode::Char(ch) => {
                    buf.push(ch);
                    write!(out, "*")?;
                    out.flush()?;
                }
                KeyCode::Backspace => {
                    if buf.pop().is_some() {
                        write!(out, "\u{8} \u{8}")?;
                        out.flush()?;
                    }
                }
                _ => {}
            }
        }
    };

    terminal::enable_raw_mode()?;
    let result = read_keys();
    // 无论成功与否都要恢复终端
    terminal::disable_raw_mode()?;
    result
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io::Cursor;

    /// 按顺序回放预设回答，并记录被问到的问题
    #[derive(Default)]
    pub(crate) struct Scripted {
        pub(crate) replies: VecDeque<&'static str>,
        pub(crate) asked: Vec<String>,
        pub(crate) warnings: Vec<String>,
    }

    impl Scripted {
        pub(crate) fn new(replies: &[&'static str]) -> Self {
            Self { replies: replies.iter().copied().collect(), ..Default::default() }
        }

        fn next(&mut self, message: &str) -> Option<String> {
            self.asked.push(message.to_string());
            self.replies.pop_front().map(str::to_string)
        }
    }

    impl Prompter for Scripted {
        fn input(&mut self, message: &str, _default: Option<&str>) -> io::Result<Option<String>> {
            Ok(self.next(message))
        }
        fn secret(&mut self, message: &str) -> io::Result<Option<String>> {
            Ok(self.next(message))
        }
        fn select(&mut self, message: &str, _choices: &[Choice]) -> io::Result<Option<String>> {
            Ok(self.next(message))
        }
        fn warn(&mut self, message: &str) -> io::Result<()> {
            self.warnings.push(message.to_string());
            Ok(())
        }
    }

    const COLORS: &[Choice] = &[
        Choice { label: "Red", value: "red" },
        Choice { label: "Blue", value: "blue" },
    ];

    fn is_red(a: &Answers) -> bool {
        a.get("color").and_then(Value::as_str) == Some("red")
    }

    const QUESTIONS: &[Question] = &[
        Question::text("name", "name").default_value("anon").validate(non_empty),
        Question::select("color", "color", COLORS),
        Question::text("shade", "shade").when(is_red),
    ];

    #[test]
    fn empty_reply_takes_default() {
        let mut p = Scripted::new(&["", "2"]);
        let answers = collect(QUESTIONS, &mut p).unwrap();
        assert_eq!(answers["name"], "anon");
        assert_eq!(answers["color"], "blue");
    }

    #[test]
    fn hidden_question_is_absent_not_empty() {
        let mut p = Scripted::new(&["x", "blue"]);
        let answers = collect(QUESTIONS, &mut p).unwrap();
        assert!(!answers.contains_key("shade"));
        assert_eq!(p.asked, vec!["name", "color"]);
    }

    #[test]
    fn visible_question_follows_earlier_answer() {
        let mut p = Scripted::new(&["x", "RED", "dark"]);
        let answers = collect(QUESTIONS, &mut p).unwrap();
        assert_eq!(answers["color"], "red");
        assert_eq!(answers["shade"], "dark");
    }

    #[test]
    fn invalid_reply_is_asked_again() {
        const REQUIRED: &[Question] = &[Question::text("who", "who").validate(non_empty)];
        let mut p = Scripted::new(&["  ", "me"]);
        let answers = collect(REQUIRED, &mut p).unwrap();
        assert_eq!(answers["who"], "me");
        assert_eq!(p.warnings, vec!["该项不能为空"]);
    }

    #[test]
    fn out_of_range_choice_is_asked_again() {
        let mut p = Scripted::new(&["x", "7", "2"]);
        let answers = collect(QUESTIONS, &mut p).unwrap();
        assert_eq!(answers["color"], "blue");
        assert_eq!(p.warnings.len(), 1);
    }

    #[test]
    fn eof_aborts_collection() {
        let mut p = Scripted::new(&["x"]);
        let err = collect(QUESTIONS, &mut p).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn piped_secret_keeps_surrounding_spaces() {
        const SECRET: &[Question] = &[
            Question::text("user", "user"),
            Question::secret("pass", "pass").validate(non_empty),
        ];
        let input = Cursor::new("  me  \r\n  s3 cret \r\n");
        let mut out = Vec::new();
        let answers = collect(SECRET, &mut LinePrompter::new(input, &mut out)).unwrap();
        assert_eq!(answers["user"], "me");
        assert_eq!(answers["pass"], "  s3 cret ");
    }

    #[test]
    fn line_prompter_reads_piped_answers() {
        let input = Cursor::new("\n1\nwarm\n");
        let mut out = Vec::new();
        let answers = {
            let mut p = LinePrompter::new(input, &mut out);
            collect(QUESTIONS, &mut p).unwrap()
        };
        assert_eq!(answers["name"], "anon");
        assert_eq!(answers["color"], "red");
        assert_eq!(answers["shade"], "warm");
        let shown = String::from_utf8(out).unwrap();
        assert!(shown.contains("? name (anon) "));
        assert!(shown.contains("  1) Red"));
    }
}
