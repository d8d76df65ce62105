// 该文件是 Shanan （山南西风） 项目的一部分。
// src/task.rs - 任务调度
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::{
  sync::mpsc::Receiver,
  thread,
  time::{Duration, Instant},
};
use tracing::{info, warn};

use crate::{
  config::BENCHMARK_ITERATIONS,
  model::{Model, Summary},
  output::Render,
};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

fn log_summary<D: Summary>(result: &D) {
  match result.summary() {
    Some(summary) => {
      for line in summary.lines() {
        info!("{}", line);
      }
    }
    None => info!("未检测到目标"),
  }
}

/// 单张图像：推理一次并输出
pub struct OneShotTask;

impl<
  F,
  D: Summary,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始推理...");
    let now = Instant::now();
    let result = model.infer(&frame)?;
    info!("推理完成，耗时: {:.2?}", now.elapsed());
    log_summary(&result);
    output.render_result(&frame, &result)?;
    info!("渲染完成，总耗时: {:.2?}", now.elapsed());

    Ok(())
  }
}

/// 基准测试：同一帧重复推理，报告每次与平均耗时，最后输出一次结果
pub struct RepeatShotTask {
  iterations: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self {
      iterations: BENCHMARK_ITERATIONS,
    }
  }
}

impl RepeatShotTask {
  pub fn with_iterations(mut self, iterations: usize) -> Self {
    self.iterations = iterations.max(1);
    self
  }
}

impl<
  F,
  D: Summary,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for RepeatShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始基准测试，共 {} 次...", self.iterations);
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;

    let mut times = Vec::with_capacity(self.iterations);
    let mut last = None;
    for i in 0..self.iterations {
      let now = Instant::now();
      let result = model.infer(&frame)?;
      let elapsed = now.elapsed();
      info!("({})推理完成，耗时: {:.2?}", i, elapsed);
      times.push(elapsed);
      last = Some(result);
    }

    if !times.is_empty() {
      warn!(
        "平均推理时间: {:.2?}",
        times.iter().sum::<Duration>() / times.len() as u32
      );
    }

    if let Some(result) = last {
      log_summary(&result);
      output.render_result(&frame, &result)?;
    }

    Ok(())
  }
}

/// 视频：逐帧推理并输出，直到输入耗尽、达到帧数上限或收到中断信号
#[derive(Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
  interrupt: bool,
}

impl Default for ContinuousTask {
  fn default() -> Self {
    Self {
      frame_number: None,
      interrupt: true,
    }
  }
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  /// 是否安装 Ctrl-C 处理器
  pub fn with_interrupt(mut self, interrupt: bool) -> Self {
    self.interrupt = interrupt;
    self
  }

  fn install_interrupt(&self) -> Option<Receiver<()>> {
    if !self.interrupt {
      return None;
    }
    let (tx, rx) = std::sync::mpsc::channel();
    let installed = ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      let _ = tx.send(());
      thread::spawn(|| {
        thread::sleep(Duration::from_secs(30));
        warn!("强制退出程序");
        std::process::exit(1);
      });
    });
    match installed {
      Ok(()) => Some(rx),
      Err(e) => {
        warn!("无法安装中断处理器: {}", e);
        None
      }
    }
  }
}

impl<
  F,
  D: Summary,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for ContinuousTask
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let rx = self.install_interrupt();

    let mut frame_count = 0;
    let mut now = Instant::now();
    for frame in input {
      frame_count += 1;
      info!("处理第 {} 帧图像", frame_count);
      let result = model.infer(&frame)?;
      let elapsed_a = now.elapsed();
      log_summary(&result);
      output.render_result(&frame, &result)?;
      let elapsed_b = now.elapsed();
      now = Instant::now();
      info!("推理完成，耗时: {:.2?} / {:.2?}", elapsed_a, elapsed_b);
      if self.frame_number.is_some_and(|n| frame_count >= n) {
        info!("达到指定帧数 {}, 退出任务循环", frame_count);
        break;
      }
      if rx.as_ref().is_some_and(|rx| rx.try_recv().is_ok()) {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    if frame_count == 0 {
      return Err(anyhow::anyhow!("没有可处理的输入帧"));
    }
    info!("任务完成，共处理 {} 帧", frame_count);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::{Cell, RefCell};
  use std::convert::Infallible;
  use std::rc::Rc;

  struct Double {
    calls: Rc<Cell<usize>>,
  }

  impl Model for Double {
    type Input = u32;
    type Output = Doubled;
    type Error = Infallible;

    fn infer(&self, input: &u32) -> Result<Doubled, Infallible> {
      self.calls.set(self.calls.get() + 1);
      Ok(Doubled(input * 2))
    }
  }

  struct Doubled(u32);

  impl Summary for Doubled {
    fn summary(&self) -> Option<String> {
      (self.0 > 0).then(|| format!("value:{}", self.0))
    }
  }

  #[derive(Default)]
  struct Collect {
    seen: RefCell<Vec<(u32, u32)>>,
  }

  impl Render<u32, Doubled> for &Collect {
    type Error = Infallible;

    fn render_result(&self, frame: &u32, result: &Doubled) -> Result<(), Infallible> {
      self.seen.borrow_mut().push((*frame, result.0));
      Ok(())
    }
  }

  fn model() -> Double {
    Double {
      calls: Rc::new(Cell::new(0)),
    }
  }

  #[test]
  fn one_shot_renders_first_frame() {
    let output = Collect::default();
    OneShotTask
      .run_task(vec![3u32, 4].into_iter(), model(), &output)
      .unwrap();
    assert_eq!(*output.seen.borrow(), vec![(3, 6)]);
  }

  #[test]
  fn one_shot_without_frames_fails() {
    let output = Collect::default();
    assert!(
      OneShotTask
        .run_task(Vec::<u32>::new().into_iter(), model(), &output)
        .is_err()
    );
  }

  #[test]
  fn repeat_shot_infers_n_times_and_renders_once() {
    let output = Collect::default();
    let m = model();
    let calls = m.calls.clone();
    RepeatShotTask::default()
      .with_iterations(3)
      .run_task(vec![5u32].into_iter(), m, &output)
      .unwrap();
    assert_eq!(calls.get(), 3);
    assert_eq!(*output.seen.borrow(), vec![(5, 10)]);
  }

  #[test]
  fn continuous_stops_at_frame_number() {
    let output = Collect::default();
    ContinuousTask::default()
      .with_interrupt(false)
      .with_frame_number(Some(2))
      .run_task(vec![0u32, 1, 2, 3].into_iter(), model(), &output)
      .unwrap();
    assert_eq!(*output.seen.borrow(), vec![(0, 0), (1, 2)]);
  }

  #[test]
  fn continuous_without_frames_fails() {
    let output = Collect::default();
    assert!(
      ContinuousTask::default()
        .with_interrupt(false)
        .run_task(Vec::<u32>::new().into_iter(), model(), &output)
        .is_err()
    );
    assert!(output.seen.borrow().is_empty());
  }

  #[test]
  fn continuous_drains_input() {
    let output = Collect::default();
    ContinuousTask::default()
      .with_interrupt(false)
      .run_task(vec![1u32, 2, 3].into_iter(), model(), &output)
      .unwrap();
    assert_eq!(output.seen.borrow().len(), 3);
  }
}
