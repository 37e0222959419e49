use super::*;

#[test]
fn test_defaults() {
  let params = ReconstructionParams::default();
  assert_eq!(params.f, 0.8);
  assert_eq!(params.bias, 2.0);
  assert_eq!(params.los, LineOfSight::Local);
  assert_eq!(params.smoothing_radius, 15.0);
  assert_eq!(params.recon_pad, 1.5);
  assert_eq!(params.engine, ReconEngine::Fft);
  assert!(params.validate().is_ok());
}

#[test]
fn test_from_tokens_prefix() {
  let params = ReconstructionParams::from_tokens(ReconMode::Rsd, &["0.5", "1.8"]).unwrap();
  assert_eq!(params.mode, ReconMode::Rsd);
  assert_eq!(params.f, 0.5);
  assert_eq!(params.bias, 1.8);
  assert_eq!(params.smoothing_radius, 15.0);
}

#[test]
fn test_from_tokens_full() {
  let tokens = ["0.7", "2.2", "z", "10", "2.0", "fft"];
  let params = ReconstructionParams::from_tokens(ReconMode::DispRsd, &tokens).unwrap();
  assert_eq!(params.los, LineOfSight::Axis(2));
  assert_eq!(params.smoothing_radius, 10.0);
  assert_eq!(params.recon_pad, 2.0);
}

#[test]
fn test_from_tokens_rejects_bad_input() {
  let cases: [&[&str]; 5] = [
    &["fast"],
    &["0.8", "2.0", "sideways"],
    &["0.8", "2.0", "local", "15", "1.5", "multigrid"],
    &["0.8", "2.0", "local", "15", "1.5", "fft", "extra"],
    &["0.8", "-1.0"],
  ];
  for tokens in cases {
    let err = ReconstructionParams::from_tokens(ReconMode::Disp, tokens).unwrap_err();
    assert!(matches!(err, VoidError::InvalidReconstruction(_)), "{tokens:?}");
  }
}

#[test]
fn test_validate_ranges() {
  assert!(ReconstructionParams::default().with_recon_pad(0.9).validate().is_err());
  assert!(ReconstructionParams::default().with_smoothing_radius(0.0).validate().is_err());
  assert!(ReconstructionParams::default().with_f(f64::NAN).validate().is_err());
  assert!(ReconstructionParams::default().with_los(LineOfSight::Axis(3)).validate().is_err());
  assert!(ReconstructionParams::default().with_f(0.0).validate().is_ok());
}

#[test]
fn test_mode_parsing() {
  assert_eq!("disp".parse::<ReconMode>().unwrap(), ReconMode::Disp);
  assert_eq!("RSD".parse::<ReconMode>().unwrap(), ReconMode::Rsd);
  assert_eq!("disp+rsd".parse::<ReconMode>().unwrap(), ReconMode::DispRsd);
  assert!("iterative".parse::<ReconMode>().is_err());
  assert!(ReconMode::DispRsd.removes_displacement() && ReconMode::DispRsd.removes_rsd());
  assert!(!ReconMode::Rsd.removes_displacement());
}

#[test]
fn test_line_of_sight_direction() {
  let p = DVec3::new(3.0, 0.0, 4.0);
  assert!((LineOfSight::Local.direction(p) - DVec3::new(0.6, 0.0, 0.8)).length() < 1e-15);
  assert_eq!(LineOfSight::Local.direction(DVec3::ZERO), DVec3::ZERO);
  assert_eq!(LineOfSight::Axis(1).direction(p), DVec3::Y);
}

#[test]
fn test_apply_tokens_keeps_later_fields() {
  let mut params = ReconstructionParams::new(ReconMode::Disp)
    .with_los(LineOfSight::Axis(1))
    .with_smoothing_radius(8.0)
    .with_recon_pad(2.5);
  params.apply_tokens(&["0.4"]).unwrap();

  assert_eq!(params.f, 0.4);
  assert_eq!(params.bias, 2.0);
  assert_eq!(params.los, LineOfSight::Axis(1));
  assert_eq!(params.smoothing_radius, 8.0);
  assert_eq!(params.recon_pad, 2.5);

  assert!(params.apply_tokens(&["0.4", "-1"]).is_err());
}
