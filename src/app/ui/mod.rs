mod controls;
mod details;
mod evidence;
mod legend;
